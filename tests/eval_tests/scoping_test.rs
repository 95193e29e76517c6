use jante::{
    config::EvalConfig,
    eval::{EvalError, Evaluator},
    event::{Address, Message},
};
use pretty_assertions::assert_eq;

use crate::running_bot;

async fn evaluate(text: &str) -> Result<String, EvalError> {
    let (bot, _rx) = running_bot().await;
    let origin = Message::new("", "alice", Address::external("#chan"));
    Evaluator::new(bot.host(), &origin, "!", &EvalConfig::default())
        .evaluate(text)
        .await
}

#[tokio::test]
async fn test_outer_bindings_visible_inside() {
    assert_eq!(
        evaluate("x = !a; y = $(z = !b; !c $z); !d $x $y").await,
        Ok("d(a() c(b()))".to_string())
    );
    assert_eq!(
        evaluate("x = !a; y = $(!c $x); !d $y").await,
        Ok("d(c(a()))".to_string())
    );
}

#[tokio::test]
async fn test_inner_bindings_do_not_leak() {
    assert_eq!(
        evaluate("x = !a; y = $(z = !b; !c $z); !d $z").await,
        Err(EvalError::UnboundVariable {
            name: "z".to_string()
        })
    );
}

#[tokio::test]
async fn test_reassignment_shadows() {
    assert_eq!(
        evaluate("x = !a; x = !b; !d $x").await,
        Ok("d(b())".to_string())
    );
}

#[tokio::test]
async fn test_unbound_variable() {
    assert_eq!(
        evaluate("!d $missing").await,
        Err(EvalError::UnboundVariable {
            name: "missing".to_string()
        })
    );
}
