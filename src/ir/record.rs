//! Plain serde records for exporting and importing an IR tree.
//!
//! Export walks every container through its address index, so children
//! always come out in ascending address (or offset) order no matter how
//! they were inserted. Import inserts each child through the owner's
//! `add_*` method, rebuilding every index.

use serde::{Deserialize, Serialize};

use crate::core::id::NodeId;
use crate::error::{IrError, Result};

use super::block::{Block, BlockKind};
use super::byte_interval::ByteInterval;
use super::module::{FileFormat, Isa, Module};
use super::section::{Section, SectionFlag};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub id: NodeId,
    pub offset: u64,
    pub size: u64,
    pub kind: BlockKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteIntervalRecord {
    pub id: NodeId,
    #[serde(default)]
    pub address: Option<u64>,
    pub size: u64,
    /// Initialized bytes, hex encoded
    #[serde(default, with = "hex_bytes")]
    pub contents: Vec<u8>,
    #[serde(default)]
    pub blocks: Vec<BlockRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRecord {
    pub id: NodeId,
    pub name: String,
    #[serde(default)]
    pub flags: Vec<SectionFlag>,
    #[serde(default)]
    pub byte_intervals: Vec<ByteIntervalRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRecord {
    pub id: NodeId,
    pub name: String,
    #[serde(default)]
    pub binary_path: String,
    #[serde(default)]
    pub preferred_address: u64,
    #[serde(default)]
    pub rebase_delta: i64,
    #[serde(default)]
    pub file_format: FileFormat,
    #[serde(default)]
    pub isa: Isa,
    #[serde(default)]
    pub sections: Vec<SectionRecord>,
}

impl ModuleRecord {
    /// Serialize to JSON string
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from JSON string
    pub fn from_json_string(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A duplicate id inside one record is malformed input, not a runtime
/// conflict.
fn malformed(err: IrError) -> IrError {
    match err {
        IrError::Duplicate { kind, id } => {
            IrError::InvalidInput(format!("record lists {} {} more than once", kind, id))
        }
        other => other,
    }
}

impl Block {
    pub fn to_record(&self) -> BlockRecord {
        BlockRecord {
            id: self.id(),
            offset: self.offset(),
            size: self.size(),
            kind: self.kind(),
        }
    }

    pub fn from_record(record: BlockRecord) -> Self {
        Block::with_id(record.id, record.offset, record.size, record.kind)
    }
}

impl ByteInterval {
    pub fn to_record(&self) -> ByteIntervalRecord {
        ByteIntervalRecord {
            id: self.id(),
            address: self.address(),
            size: self.size(),
            contents: self.contents().to_vec(),
            blocks: self.blocks().map(Block::to_record).collect(),
        }
    }

    pub fn from_record(record: ByteIntervalRecord) -> Result<Self> {
        if record.contents.len() as u64 > record.size {
            return Err(IrError::InvalidInput(format!(
                "byte interval {} holds {} bytes but declares size {}",
                record.id,
                record.contents.len(),
                record.size
            )));
        }
        let mut interval = ByteInterval::with_id(record.id, record.address, record.size);
        interval.set_contents(record.contents);
        for block in record.blocks {
            interval.add_block(Block::from_record(block)).map_err(malformed)?;
        }
        Ok(interval)
    }
}

impl Section {
    pub fn to_record(&self) -> SectionRecord {
        SectionRecord {
            id: self.id(),
            name: self.name().to_string(),
            flags: self.flags().to_vec(),
            byte_intervals: self.byte_intervals().map(ByteInterval::to_record).collect(),
        }
    }

    pub fn from_record(record: SectionRecord) -> Result<Self> {
        let mut section = Section::with_id(record.id, record.name, record.flags);
        for interval in record.byte_intervals {
            section
                .add_byte_interval(ByteInterval::from_record(interval)?)
                .map_err(malformed)?;
        }
        Ok(section)
    }
}

impl Module {
    pub fn to_record(&self) -> ModuleRecord {
        ModuleRecord {
            id: self.id(),
            name: self.name().to_string(),
            binary_path: self.binary_path().to_string(),
            preferred_address: self.preferred_address(),
            rebase_delta: self.rebase_delta(),
            file_format: self.file_format(),
            isa: self.isa(),
            sections: self.sections().map(Section::to_record).collect(),
        }
    }

    pub fn from_record(record: ModuleRecord) -> Result<Self> {
        let _span = crate::span_trace!("import_module", module = %record.name).entered();
        let mut module = Module::with_id(record.id, record.name, record.binary_path);
        module.set_preferred_address(record.preferred_address);
        module.set_rebase_delta(record.rebase_delta);
        module.set_file_format(record.file_format);
        module.set_isa(record.isa);
        for section in record.sections {
            module
                .add_section(Section::from_record(section)?)
                .map_err(malformed)?;
        }
        Ok(module)
    }

    pub fn to_json_string(&self) -> Result<String> {
        self.to_record().to_json_string()
    }

    pub fn from_json_string(json: &str) -> Result<Self> {
        Module::from_record(ModuleRecord::from_json_string(json)?)
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        hex::decode(text).map_err(serde::de::Error::custom)
    }
}
