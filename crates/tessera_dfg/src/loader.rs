//! JSON application loader.
//!
//! ```json
//! {
//!   "name": "mac",
//!   "inputs": ["x", "w"],
//!   "operations": [
//!     { "name": "m", "opcode": "mul", "operands": ["x", "w"] },
//!     { "name": "s", "opcode": "add", "operands": ["m", { "const": 7 }] }
//!   ],
//!   "outputs": [{ "name": "y", "from": "s" }]
//! }
//! ```
//!
//! Operands refer to an input or to an operation declared anywhere in the
//! file; a `{"const": n}` object is a constant operand.

use crate::app::{Application, ApplicationBuilder};
use crate::error::DfgError;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct AppFile {
    name: String,
    #[serde(default)]
    inputs: Vec<String>,
    operations: Vec<OpEntry>,
    #[serde(default)]
    outputs: Vec<OutEntry>,
}

#[derive(Debug, Deserialize)]
struct OpEntry {
    name: String,
    opcode: String,
    #[serde(default)]
    operands: Vec<Operand>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Operand {
    Ref(String),
    Const {
        #[serde(rename = "const")]
        value: i64,
    },
}

#[derive(Debug, Deserialize)]
struct OutEntry {
    name: String,
    from: String,
}

/// Reads and validates an application from a JSON file.
pub fn load_application(path: &Path) -> Result<Application, DfgError> {
    let text = std::fs::read_to_string(path).map_err(|source| DfgError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_application(&text)
}

/// Parses and validates an application from JSON text.
pub fn parse_application(text: &str) -> Result<Application, DfgError> {
    let file: AppFile = serde_json::from_str(text)?;
    let mut b = ApplicationBuilder::new(file.name);
    for entry in &file.operations {
        b.op(&entry.name, &entry.opcode)?;
    }
    for name in &file.inputs {
        b.input(name)?;
    }
    for entry in &file.operations {
        let Some(user) = b.op_id(&entry.name) else {
            continue;
        };
        for (slot, operand) in entry.operands.iter().enumerate() {
            let slot = slot as u32;
            match operand {
                Operand::Const { value } => {
                    b.constant(*value, user, slot);
                }
                Operand::Ref(name) => {
                    if let Some(src) = b.op_id(name) {
                        b.edge(src, user, slot);
                    } else if let Some(port) = b.input_index(name) {
                        b.input_edge(port, user, slot);
                    } else {
                        return Err(DfgError::UnknownOperand {
                            user: entry.name.clone(),
                            name: name.clone(),
                        });
                    }
                }
            }
        }
    }
    for out in &file.outputs {
        let producer = b.op_id(&out.from).ok_or_else(|| DfgError::UnknownOperand {
            user: out.name.clone(),
            name: out.from.clone(),
        })?;
        b.output(&out.name, producer)?;
    }
    b.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MAC: &str = r#"{
        "name": "mac",
        "inputs": ["x", "w"],
        "operations": [
            { "name": "s", "opcode": "add", "operands": ["m", { "const": 7 }] },
            { "name": "m", "opcode": "mul", "operands": ["x", "w"] }
        ],
        "outputs": [{ "name": "y", "from": "s" }]
    }"#;

    #[test]
    fn parse_mac() {
        let app = parse_application(MAC).unwrap();
        assert_eq!(app.name(), "mac");
        assert_eq!(app.op_count(), 2);
        let m = app.find_op("m").unwrap();
        let s = app.find_op("s").unwrap();
        assert_eq!(app.consumers(m), vec![s]);
        assert_eq!(app.const_edges()[0].value, 7);
        assert_eq!(app.inputs().len(), 2);
        assert_eq!(app.outputs()[0].producer, s);
        assert_eq!(app.topo_order(), &[m, s]);
    }

    #[test]
    fn unknown_operand() {
        let text = r#"{"name": "bad", "operations": [
            {"name": "a", "opcode": "neg", "operands": ["ghost"]}
        ]}"#;
        let err = parse_application(text).unwrap_err();
        assert!(matches!(err, DfgError::UnknownOperand { .. }));
    }

    #[test]
    fn unknown_output_source() {
        let text = r#"{"name": "bad",
            "operations": [{"name": "a", "opcode": "neg"}],
            "outputs": [{"name": "y", "from": "b"}]}"#;
        assert!(matches!(
            parse_application(text),
            Err(DfgError::UnknownOperand { .. })
        ));
    }

    #[test]
    fn malformed_json() {
        assert!(matches!(
            parse_application("{ not json"),
            Err(DfgError::Parse(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MAC.as_bytes()).unwrap();
        let app = load_application(file.path()).unwrap();
        assert_eq!(app.op_count(), 2);
    }

    #[test]
    fn missing_file() {
        let err = load_application(Path::new("/nonexistent/app.json")).unwrap_err();
        assert!(matches!(err, DfgError::Io { .. }));
    }
}
