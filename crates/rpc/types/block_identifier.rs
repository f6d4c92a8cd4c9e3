use serde_json::Value;
use std::fmt;

/// Block reference accepted by the state-querying RPC methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockIdentifier {
    Number(u64),
    Tag(BlockTag),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    Earliest,
    Latest,
    Pending,
}

impl BlockIdentifier {
    pub fn as_param(&self) -> Value {
        match self {
            BlockIdentifier::Number(n) => Value::String(format!("0x{n:x}")),
            BlockIdentifier::Tag(tag) => Value::String(tag.to_string()),
        }
    }
}

impl fmt::Display for BlockTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockTag::Earliest => write!(f, "earliest"),
            BlockTag::Latest => write!(f, "latest"),
            BlockTag::Pending => write!(f, "pending"),
        }
    }
}

impl fmt::Display for BlockIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockIdentifier::Number(n) => write!(f, "0x{n:x}"),
            BlockIdentifier::Tag(tag) => write!(f, "{tag}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_params() {
        assert_eq!(
            BlockIdentifier::Tag(BlockTag::Latest).as_param(),
            Value::String("latest".into())
        );
        assert_eq!(
            BlockIdentifier::Tag(BlockTag::Pending).as_param(),
            Value::String("pending".into())
        );
    }

    #[test]
    fn number_param_is_hex() {
        assert_eq!(
            BlockIdentifier::Number(26).as_param(),
            Value::String("0x1a".into())
        );
    }
}
