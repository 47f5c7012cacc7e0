use alloy::primitives::hex;
use alloy::json_abi::{Function, JsonAbi};
use alloy::primitives::Bytes;
use once_cell::sync::OnceCell;

use crate::error::{Error, Result};

const ABI_JSON: &str = include_str!("../abi/GlobalExitRootManagerL2SovereignChain.json");
const BYTECODE_HEX: &str = include_str!("../abi/GlobalExitRootManagerL2SovereignChain.bin");

static DESCRIPTOR: OnceCell<ContractDescriptor> = OnceCell::new();

/// The interface schema and the deployable binary image of the contract.
///
/// Fixed at build time and never mutated. Obtain the shared instance with
/// [`descriptor`].
#[derive(Debug, Clone)]
pub struct ContractDescriptor {
    abi: JsonAbi,
    bytecode: Bytes,
}

impl ContractDescriptor {
    fn load() -> Result<Self> {
        let abi: JsonAbi = serde_json::from_str(ABI_JSON)
            .map_err(|e| Error::Descriptor(format!("invalid interface schema: {e}")))?;
        let bytecode = hex::decode(BYTECODE_HEX.trim())
            .map_err(|e| Error::Descriptor(format!("invalid binary image: {e}")))?;
        if bytecode.is_empty() {
            return Err(Error::Descriptor("empty binary image".to_string()));
        }

        Ok(Self {
            abi,
            bytecode: bytecode.into(),
        })
    }

    pub fn abi(&self) -> &JsonAbi {
        &self.abi
    }

    /// Creation code, submitted verbatim ahead of the constructor arguments.
    pub fn bytecode(&self) -> &Bytes {
        &self.bytecode
    }

    /// Looks up a function of the schema by name.
    ///
    /// The contract declares no overloads, so the first entry is the only one.
    pub fn function(&self, name: &str) -> Result<&Function> {
        self.abi
            .function(name)
            .and_then(|overloads| overloads.first())
            .ok_or_else(|| Error::UnknownMethod(name.to_string()))
    }
}

/// Returns the process-wide contract descriptor, parsing it on first use.
pub fn descriptor() -> Result<&'static ContractDescriptor> {
    DESCRIPTOR.get_or_try_init(ContractDescriptor::load)
}
