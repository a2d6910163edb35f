use serde::{Deserialize, Serialize};

/// A batch work item placed on the durable stream, keyed by repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamMessage {
    pub repository: String,
    pub batch_number: u32,
    pub files: Vec<String>,
    pub upload_session_id: String,
}

impl StreamMessage {
    /// Encode as the flat field map the `redis` Streams API expects for
    /// `XADD`/`XREADGROUP` entries.
    #[must_use]
    pub fn to_fields(&self) -> Vec<(String, String)> {
        vec![
            ("repository".into(), self.repository.clone()),
            ("batch_number".into(), self.batch_number.to_string()),
            ("files".into(), self.files.join(",")),
            ("upload_session_id".into(), self.upload_session_id.clone()),
        ]
    }

    /// Decode from the field map read back off a stream entry.
    #[must_use]
    pub fn from_fields(fields: &[(String, String)]) -> Option<Self> {
        let get = |key: &str| fields.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone());
        Some(Self {
            repository: get("repository")?,
            batch_number: get("batch_number")?.parse().ok()?,
            files: get("files")
                .map(|v| {
                    if v.is_empty() {
                        Vec::new()
                    } else {
                        v.split(',').map(str::to_string).collect()
                    }
                })
                .unwrap_or_default(),
            upload_session_id: get("upload_session_id")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_fields() {
        let msg = StreamMessage {
            repository: "repo".into(),
            batch_number: 3,
            files: vec!["a.py".into(), "b.ts".into()],
            upload_session_id: "upload_1".into(),
        };
        let fields = msg.to_fields();
        let back = StreamMessage::from_fields(&fields).unwrap();
        assert_eq!(msg, back);
    }

    #[test]
    fn empty_file_list_round_trips() {
        let msg = StreamMessage {
            repository: "repo".into(),
            batch_number: 0,
            files: vec![],
            upload_session_id: "upload_2".into(),
        };
        let back = StreamMessage::from_fields(&msg.to_fields()).unwrap();
        assert!(back.files.is_empty());
    }
}
