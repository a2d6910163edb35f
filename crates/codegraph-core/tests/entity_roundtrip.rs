//! Serde roundtrip tests for all entity types.

use chrono::Utc;
use codegraph_core::entities::*;
use codegraph_core::enums::*;
use pretty_assertions::assert_eq;

macro_rules! roundtrip {
    ($name:ident, $ty:ty, $instance:expr) => {
        #[test]
        fn $name() {
            let val: $ty = $instance;
            let json_str = serde_json::to_string_pretty(&val).unwrap();
            let recovered: $ty = serde_json::from_str(&json_str).unwrap();
            assert_eq!(recovered, val, "serde roundtrip failed for {}", stringify!($ty));
        }
    };
}

roundtrip!(
    chunk_roundtrip,
    Chunk,
    Chunk {
        id: "chunk_1".into(),
        repository: "repo".into(),
        file_path: "a.py".into(),
        language: "python".into(),
        kind: ChunkKind::Function,
        name: "handle".into(),
        qualified_name: Some("a.handle".into()),
        source_text: "def handle(): pass".into(),
        start_line: 1,
        end_line: 1,
        commit_id: None,
        metadata: ChunkMetadata::default(),
        text_embedding: Some(vec![0.1; 768]),
        code_embedding: None,
        indexed_at: Utc::now(),
        last_modified_at: None,
        node_id: None,
    }
);

roundtrip!(
    node_roundtrip,
    Node,
    Node {
        id: "node_1".into(),
        repository: "repo".into(),
        kind: NodeKind::Function,
        label: "handle".into(),
        qualified_name: "a.handle".into(),
        properties: NodeProperties::default(),
        created_at: Utc::now(),
    }
);

roundtrip!(
    edge_roundtrip,
    Edge,
    Edge {
        id: "edge_1".into(),
        repository: "repo".into(),
        source_node_id: "node_1".into(),
        target_node_id: "node_2".into(),
        relation: EdgeRelation::Calls,
        properties: EdgeProperties::default(),
        created_at: Utc::now(),
    }
);

roundtrip!(
    memory_roundtrip,
    MemoryRecord,
    MemoryRecord {
        id: "mem_1".into(),
        title: "title".into(),
        content: "content".into(),
        memory_type: MemoryType::Note,
        tags: vec!["x".into()],
        author: None,
        project_id: None,
        related_chunk_ids: vec![],
        created_at: Utc::now(),
        updated_at: Utc::now(),
        deleted_at: None,
        embedding: None,
        embedding_model: None,
    }
);

roundtrip!(
    upload_session_roundtrip,
    UploadSession,
    UploadSession {
        id: "upload_1".into(),
        repository: "repo".into(),
        total_files: 10,
        counters: StageCounters::default(),
        current_file: Some("a.py".into()),
        errors: vec![],
        status: UploadStatus::Processing,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
);

roundtrip!(
    stream_message_roundtrip,
    StreamMessage,
    StreamMessage {
        repository: "repo".into(),
        batch_number: 1,
        files: vec!["a.py".into()],
        upload_session_id: "upload_1".into(),
    }
);
