use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use config::EngineConfig;
use index::Ascending;
use wal::{I64Codec, Serializer, StringCodec};

use crate::Segment;

pub type IntSegment = Segment<i64, i64, Ascending>;

/// Small nodes so a few hundred keys already split the tree.
pub fn test_config() -> EngineConfig {
    EngineConfig {
        wal_sync: false,
        ..EngineConfig::default().with_node_capacity(4)
    }
}

pub fn open_int(path: &Path, config: &EngineConfig) -> Result<IntSegment> {
    let codec: Arc<dyn Serializer<i64>> = Arc::new(I64Codec);
    Segment::open(path, config, Ascending, codec.clone(), codec)
}

pub fn open_string(path: &Path) -> Result<Segment<String, String, Ascending>> {
    let codec: Arc<dyn Serializer<String>> = Arc::new(StringCodec);
    Segment::open(path, &test_config(), Ascending, codec.clone(), codec)
}
