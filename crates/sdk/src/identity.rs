use bytes::Bytes;

/// What gets deployed: creation bytecode plus ABI-encoded constructor
/// arguments. Together with a salt this pins down one deterministic
/// address, regardless of which account pays for the deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractIdentity {
    pub name: String,
    pub bytecode: Bytes,
    pub constructor_args: Bytes,
}

impl ContractIdentity {
    pub fn new(name: impl Into<String>, bytecode: impl Into<Bytes>) -> Self {
        ContractIdentity {
            name: name.into(),
            bytecode: bytecode.into(),
            constructor_args: Bytes::new(),
        }
    }

    pub fn with_constructor_args(mut self, args: impl Into<Bytes>) -> Self {
        self.constructor_args = args.into();
        self
    }

    /// `bytecode ++ constructor_args`, the init code the EVM executes at
    /// deployment time.
    pub fn init_code(&self) -> Bytes {
        if self.constructor_args.is_empty() {
            return self.bytecode.clone();
        }
        let mut code = Vec::with_capacity(self.bytecode.len() + self.constructor_args.len());
        code.extend_from_slice(&self.bytecode);
        code.extend_from_slice(&self.constructor_args);
        Bytes::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_code_concatenates_args() {
        let identity = ContractIdentity::new("Counter", vec![0x60, 0x80])
            .with_constructor_args(vec![0x00, 0x2a]);
        assert_eq!(identity.init_code().as_ref(), &[0x60, 0x80, 0x00, 0x2a]);
    }

    #[test]
    fn init_code_without_args_is_the_bytecode() {
        let identity = ContractIdentity::new("Counter", vec![0x60, 0x80]);
        assert_eq!(identity.init_code(), identity.bytecode);
    }
}
