//! Flow program definition and validation

use flow_core::BlockId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::DeviceCatalog;
use crate::condition::Condition;
use crate::error::{LoadError, LoadResult};
use crate::instruction::Instruction;

/// Ordered instruction sequence of one block
pub type Block = Vec<Instruction>;

/// A complete flow program
///
/// Immutable once loaded. Blocks keep their declaration order so that
/// validation errors and serialization are stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ast {
    /// Block the flow starts in
    #[serde(rename = "initBlockID")]
    pub init_block_id: BlockId,

    /// Named top-level sequences
    pub blocks: IndexMap<BlockId, Block>,
}

impl Ast {
    /// Create a program from its init block and blocks
    pub fn new<I, K>(init_block_id: impl Into<BlockId>, blocks: I) -> Self
    where
        I: IntoIterator<Item = (K, Block)>,
        K: Into<BlockId>,
    {
        Self {
            init_block_id: init_block_id.into(),
            blocks: blocks.into_iter().map(|(id, block)| (id.into(), block)).collect(),
        }
    }

    /// Parse and validate a program from JSON
    pub fn from_json_str(json: &str) -> LoadResult<Self> {
        let ast: Ast = serde_json::from_str(json)?;
        ast.validate()?;
        Ok(ast)
    }

    /// Parse and validate a program from YAML
    pub fn from_yaml_str(yaml: &str) -> LoadResult<Self> {
        let ast: Ast = serde_yaml::from_str(yaml)?;
        ast.validate()?;
        Ok(ast)
    }

    pub fn to_json_string(&self) -> LoadResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Look up a block by id
    pub fn block(&self, id: &str) -> Option<&[Instruction]> {
        self.blocks.get(id).map(Vec::as_slice)
    }

    pub fn has_block(&self, id: &str) -> bool {
        self.blocks.contains_key(id)
    }

    /// Total instructions, nested branches included
    pub fn instruction_count(&self) -> usize {
        fn count(sequence: &[Instruction]) -> usize {
            sequence
                .iter()
                .map(|instruction| match instruction {
                    Instruction::If(branch) => {
                        1 + count(&branch.true_case) + count(&branch.false_case)
                    }
                    _ => 1,
                })
                .sum()
        }
        self.blocks.values().map(|block| count(block)).sum()
    }

    /// Check that the init block and every GOTO target exist
    pub fn validate(&self) -> LoadResult<()> {
        if !self.has_block(&self.init_block_id) {
            return Err(LoadError::UnknownInitBlock(self.init_block_id.clone()));
        }

        for (block_id, block) in &self.blocks {
            walk(block, &mut |instruction| {
                if let Instruction::Goto(goto) = instruction {
                    if !self.has_block(&goto.block) {
                        return Err(LoadError::DanglingGoto {
                            block: block_id.clone(),
                            target: goto.block.clone(),
                        });
                    }
                }
                Ok(())
            })?;
        }

        debug!(
            init_block = %self.init_block_id,
            blocks = self.blocks.len(),
            "Program validated"
        );
        Ok(())
    }

    /// Structural validation plus checks against declared devices
    ///
    /// Rejects SETs on undeclared actuators, conditions on undeclared
    /// sensors, and numeric SET values outside an actuator's range.
    pub fn validate_against(&self, catalog: &DeviceCatalog) -> LoadResult<()> {
        self.validate()?;

        for (block_id, block) in &self.blocks {
            walk(block, &mut |instruction| match instruction {
                Instruction::Set(set) => {
                    if !catalog.has_actuator(&set.actuator) {
                        return Err(LoadError::UnknownActuator {
                            block: block_id.clone(),
                            actuator: set.actuator.clone(),
                        });
                    }
                    if let (Some(range), Some(value)) =
                        (catalog.actuator_range(&set.actuator), set.value.as_number())
                    {
                        if !range.contains(value) {
                            return Err(LoadError::ValueOutOfRange {
                                block: block_id.clone(),
                                actuator: set.actuator.clone(),
                                value,
                                min: range.min,
                                max: range.max,
                            });
                        }
                    }
                    Ok(())
                }
                Instruction::Wait(wait) => check_sensors(block_id, &wait.condition, catalog),
                Instruction::If(branch) => check_sensors(block_id, &branch.condition, catalog),
                Instruction::Goto(_) => Ok(()),
            })?;
        }

        Ok(())
    }
}

/// Visit every instruction depth-first, descending into IF branches
fn walk(
    sequence: &[Instruction],
    visit: &mut dyn FnMut(&Instruction) -> LoadResult<()>,
) -> LoadResult<()> {
    for instruction in sequence {
        visit(instruction)?;
        if let Instruction::If(branch) = instruction {
            walk(&branch.true_case, visit)?;
            walk(&branch.false_case, visit)?;
        }
    }
    Ok(())
}

fn check_sensors(block: &str, condition: &Condition, catalog: &DeviceCatalog) -> LoadResult<()> {
    match condition
        .sensors()
        .into_iter()
        .find(|sensor| !catalog.has_sensor(sensor))
    {
        Some(sensor) => Err(LoadError::UnknownSensor {
            block: block.to_string(),
            sensor: sensor.to_string(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Comparator;
    use flow_core::ValueRange;

    fn sample_json() -> &'static str {
        r#"{
            "initBlockID": "start",
            "blocks": {
                "start": [
                    {"opcode": "SET", "arguments": {"actuator": "valve", "value": 1}},
                    {"opcode": "WAIT", "arguments": {"condition": {
                        "conditionType": "BASE", "sensor": "moisture", "comparison": ">=", "value": 40
                    }}},
                    {"opcode": "GOTO", "arguments": {"block": "stop"}}
                ],
                "stop": [
                    {"opcode": "IF", "arguments": {
                        "condition": {"conditionType": "BASE", "sensor": "rain", "comparison": "=", "value": true},
                        "instructions_true_case": [
                            {"opcode": "SET", "arguments": {"actuator": "valve", "value": 0}}
                        ],
                        "instructions_false_case": [
                            {"opcode": "GOTO", "arguments": {"block": "start"}}
                        ]
                    }}
                ]
            }
        }"#
    }

    #[test]
    fn test_parse_json_program() {
        let ast = Ast::from_json_str(sample_json()).unwrap();

        assert_eq!(ast.init_block_id, "start");
        assert_eq!(ast.blocks.len(), 2);
        assert_eq!(ast.block("start").map(<[_]>::len), Some(3));
        assert_eq!(ast.instruction_count(), 6);
        assert!(ast.block("missing").is_none());
    }

    #[test]
    fn test_parse_yaml_program() {
        let yaml = r#"
initBlockID: main
blocks:
  main:
    - opcode: SET
      arguments:
        actuator: heater
        value: true
    - opcode: GOTO
      arguments:
        block: main
"#;

        let ast = Ast::from_yaml_str(yaml).unwrap();
        assert_eq!(
            ast.block("main").unwrap(),
            &[Instruction::set("heater", true), Instruction::goto("main")]
        );
    }

    #[test]
    fn test_json_roundtrip_preserves_block_order() {
        let ast = Ast::from_json_str(sample_json()).unwrap();
        let json = ast.to_json_string().unwrap();
        let reparsed = Ast::from_json_str(&json).unwrap();

        assert_eq!(ast, reparsed);
        let order: Vec<_> = reparsed.blocks.keys().cloned().collect();
        assert_eq!(order, vec!["start", "stop"]);
    }

    #[test]
    fn test_unknown_init_block() {
        let ast = Ast::new("nowhere", [("main", vec![])]);
        let err = ast.validate().unwrap_err();
        assert!(matches!(err, LoadError::UnknownInitBlock(ref id) if id == "nowhere"));
    }

    #[test]
    fn test_dangling_goto_in_nested_branch() {
        let ast = Ast::new(
            "main",
            [(
                "main",
                vec![Instruction::if_else(
                    Condition::all(vec![]),
                    vec![],
                    vec![Instruction::goto("ghost")],
                )],
            )],
        );

        let err = ast.validate().unwrap_err();
        match err {
            LoadError::DanglingGoto { block, target } => {
                assert_eq!(block, "main");
                assert_eq!(target, "ghost");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_value_shape_rejected() {
        let json = r#"{
            "initBlockID": "main",
            "blocks": {"main": [
                {"opcode": "SET", "arguments": {"actuator": "a", "value": [1, 2]}}
            ]}
        }"#;
        assert!(matches!(Ast::from_json_str(json), Err(LoadError::Json(_))));
    }

    #[test]
    fn test_validate_against_catalog() {
        let ast = Ast::from_json_str(sample_json()).unwrap();

        let catalog = DeviceCatalog::new()
            .with_sensor("moisture")
            .with_sensor("rain")
            .with_actuator("valve", Some(ValueRange::new(0.0, 1.0)));
        assert!(ast.validate_against(&catalog).is_ok());

        let missing_sensor = DeviceCatalog::new()
            .with_sensor("moisture")
            .with_actuator("valve", None);
        assert!(matches!(
            ast.validate_against(&missing_sensor),
            Err(LoadError::UnknownSensor { ref block, ref sensor })
                if block == "stop" && sensor == "rain"
        ));

        let missing_actuator = DeviceCatalog::new().with_sensor("moisture").with_sensor("rain");
        assert!(matches!(
            ast.validate_against(&missing_actuator),
            Err(LoadError::UnknownActuator { ref actuator, .. }) if actuator == "valve"
        ));
    }

    #[test]
    fn test_set_value_out_of_range() {
        let ast = Ast::new(
            "main",
            [(
                "main",
                vec![
                    Instruction::set("dimmer", 150),
                    Instruction::wait(Condition::base("lux", Comparator::Lt, 10)),
                ],
            )],
        );
        let catalog = DeviceCatalog::new()
            .with_sensor("lux")
            .with_actuator("dimmer", Some(ValueRange::new(0.0, 100.0)));

        match ast.validate_against(&catalog).unwrap_err() {
            LoadError::ValueOutOfRange { value, max, .. } => {
                assert_eq!(value, 150.0);
                assert_eq!(max, 100.0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
