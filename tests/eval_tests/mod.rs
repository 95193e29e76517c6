mod round_trip_test;
mod scoping_test;
