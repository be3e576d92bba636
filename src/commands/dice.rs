//! `dnd_dice_roll`: roll sets of polyhedral dice.
//!
//! `rolls` is a list of `"<count>d<size>"` specs. The result maps `d<size>` to the
//! individual rolls; a later spec for the same size replaces an earlier one.

use crate::messaging::CommandParams;
use crate::registry::{param_str_list, CommandContext, CommandHandler, CommandOutcome};
use anyhow::Context;
use async_trait::async_trait;
use rand::Rng;
use serde_json::{Map, Value};
use tracing::info;

/// Dice sizes that exist on the table
pub const DICE_SET: [u32; 6] = [4, 6, 8, 10, 12, 20];

pub const MAX_DICE_PER_ROLL: u32 = 100;

#[derive(Debug, Default)]
pub struct DndDiceRoll;

impl DndDiceRoll {
    pub fn new() -> Self {
        Self
    }
}

/// One parsed `<count>d<size>` spec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RollSpec {
    count: i64,
    size: u32,
}

fn parse_spec(spec: &str) -> anyhow::Result<RollSpec> {
    let (count, size) = spec
        .split_once('d')
        .with_context(|| format!("roll '{spec}' is not in <count>d<size> form"))?;
    let count = count
        .trim()
        .parse::<i64>()
        .with_context(|| format!("invalid dice count in roll '{spec}'"))?;
    let size = size
        .trim()
        .parse::<u32>()
        .with_context(|| format!("invalid dice size in roll '{spec}'"))?;
    Ok(RollSpec { count, size })
}

/// Why a well-formed spec cannot be rolled
fn reject_reason(spec: RollSpec) -> Option<String> {
    let RollSpec { count, size } = spec;
    if !DICE_SET.contains(&size) {
        Some(format!("Dice size d{size} not in set"))
    } else if count < 1 {
        Some(format!("Number of dice less than 1 for d{size}"))
    } else if count > i64::from(MAX_DICE_PER_ROLL) {
        Some(format!("{count} rolls for d{size} is too many"))
    } else {
        None
    }
}

fn roll_dice(specs: &[RollSpec]) -> Map<String, Value> {
    let mut rng = rand::rng();
    let mut results = Map::new();
    for spec in specs {
        let rolls: Vec<Value> = (0..spec.count)
            .map(|_| Value::from(rng.random_range(1..=spec.size)))
            .collect();
        results.insert(format!("d{}", spec.size), Value::Array(rolls));
    }
    results
}

#[async_trait]
impl CommandHandler for DndDiceRoll {
    fn name(&self) -> &str {
        "dnd_dice_roll"
    }

    fn required_params(&self) -> &[&'static str] {
        &["rolls"]
    }

    async fn invoke(
        &self,
        params: &CommandParams,
        ctx: &CommandContext,
    ) -> anyhow::Result<CommandOutcome> {
        let rolls = param_str_list(params, "rolls")?;
        info!(job_id = %ctx.job_id, rolls = ?rolls, "🎲 Performing dice roll");

        let mut specs = Vec::with_capacity(rolls.len());
        for roll in &rolls {
            let spec = parse_spec(roll)?;
            if let Some(reason) = reject_reason(spec) {
                return Ok(CommandOutcome::Rejected(reason));
            }
            specs.push(spec);
        }

        Ok(CommandOutcome::Completed(Value::Object(roll_dice(&specs))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::JobId;
    use serde_json::json;

    async fn roll(rolls: Value) -> anyhow::Result<CommandOutcome> {
        let params = json!({ "rolls": rolls }).as_object().cloned().unwrap();
        DndDiceRoll::new()
            .invoke(&params, &CommandContext::new(JobId::generate(), "worker-0"))
            .await
    }

    #[tokio::test]
    async fn test_rolls_are_in_range() {
        let CommandOutcome::Completed(result) = roll(json!(["3d20", "100d4"])).await.unwrap()
        else {
            panic!("expected completed outcome");
        };

        let d20 = result["d20"].as_array().unwrap();
        assert_eq!(d20.len(), 3);
        assert!(d20.iter().all(|v| (1..=20).contains(&v.as_u64().unwrap())));
        assert_eq!(result["d4"].as_array().unwrap().len(), 100);
    }

    #[tokio::test]
    async fn test_later_spec_replaces_same_size() {
        let CommandOutcome::Completed(result) = roll(json!(["2d6", "5d6"])).await.unwrap() else {
            panic!("expected completed outcome");
        };
        assert_eq!(result["d6"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_rejections() {
        assert_eq!(
            roll(json!(["1d7"])).await.unwrap(),
            CommandOutcome::rejected("Dice size d7 not in set")
        );
        assert_eq!(
            roll(json!(["0d6"])).await.unwrap(),
            CommandOutcome::rejected("Number of dice less than 1 for d6")
        );
        assert_eq!(
            roll(json!(["101d20"])).await.unwrap(),
            CommandOutcome::rejected("101 rolls for d20 is too many")
        );
    }

    #[tokio::test]
    async fn test_unparsable_spec_is_an_error() {
        assert!(roll(json!(["d6"])).await.is_err());
        assert!(roll(json!(["twod6"])).await.is_err());
        assert!(roll(json!("2d6")).await.is_err());
    }
}
