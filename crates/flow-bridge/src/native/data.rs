//! Values carried on node ports.

use crate::errors::{BridgeError, BridgeResult};
use std::fmt;

/// Scalar value stored on a node port
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Int(i32),
    Double(f64),
    Bool(bool),
    Text(String),
}

impl NodeData {
    /// Name of the stored type as reported across the boundary
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeData::Int(_) => "int",
            NodeData::Double(_) => "double",
            NodeData::Bool(_) => "bool",
            NodeData::Text(_) => "string",
        }
    }

    pub fn as_int(&self) -> BridgeResult<i32> {
        match self {
            NodeData::Int(v) => Ok(*v),
            other => Err(other.mismatch("int")),
        }
    }

    pub fn as_double(&self) -> BridgeResult<f64> {
        match self {
            NodeData::Double(v) => Ok(*v),
            other => Err(other.mismatch("double")),
        }
    }

    pub fn as_bool(&self) -> BridgeResult<bool> {
        match self {
            NodeData::Bool(v) => Ok(*v),
            other => Err(other.mismatch("bool")),
        }
    }

    pub fn as_str(&self) -> BridgeResult<&str> {
        match self {
            NodeData::Text(v) => Ok(v),
            other => Err(other.mismatch("string")),
        }
    }

    fn mismatch(&self, expected: &'static str) -> BridgeError {
        BridgeError::TypeMismatch {
            expected,
            found: self.type_name(),
        }
    }
}

impl fmt::Display for NodeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeData::Int(v) => write!(f, "{}", v),
            NodeData::Double(v) => write!(f, "{}", v),
            NodeData::Bool(v) => write!(f, "{}", v),
            NodeData::Text(v) => f.write_str(v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(NodeData::Int(3), "int", "3")]
    #[case(NodeData::Double(1.5), "double", "1.5")]
    #[case(NodeData::Bool(true), "bool", "true")]
    #[case(NodeData::Text("hi".into()), "string", "hi")]
    fn test_type_name_and_display(
        #[case] data: NodeData,
        #[case] type_name: &str,
        #[case] shown: &str,
    ) {
        assert_eq!(data.type_name(), type_name);
        assert_eq!(data.to_string(), shown);
    }

    #[test]
    fn test_wrong_getter_is_type_mismatch() {
        let err = NodeData::Bool(false).as_int().unwrap_err();
        assert_eq!(
            err,
            BridgeError::TypeMismatch {
                expected: "int",
                found: "bool"
            }
        );
    }
}
