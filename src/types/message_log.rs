use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogAttribute {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub attributes: Vec<LogAttribute>,
}

/// Events the chain emitted for a single message of a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageLog {
    pub msg_index: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub log: String,
    pub events: Vec<LogEvent>,
}

impl MessageLog {
    pub fn events_of<'a>(
        &'a self,
        kind: &'a str,
    ) -> impl Iterator<Item = &'a LogEvent> {
        self.events.iter().filter(move |event| event.kind == kind)
    }
}

/// Looks up the log of message `index`. The index the chain declares wins
/// over the position in the list, so a mismatch falls back to a scan.
pub fn find_log(logs: &[MessageLog], index: usize) -> Option<&MessageLog> {
    if let Some(log) = logs.get(index) {
        if log.msg_index as usize == index {
            return Some(log);
        }
    }

    logs.iter().find(|log| log.msg_index as usize == index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(msg_index: u32) -> MessageLog {
        MessageLog {
            msg_index,
            log: String::new(),
            events: vec![],
        }
    }

    #[test]
    fn finds_by_position() {
        let logs = vec![log(0), log(1), log(2)];
        assert_eq!(find_log(&logs, 1).map(|l| l.msg_index), Some(1));
    }

    #[test]
    fn falls_back_to_declared_index() {
        let logs = vec![log(2), log(0), log(1)];
        assert_eq!(find_log(&logs, 0).map(|l| l.msg_index), Some(0));
        assert_eq!(find_log(&logs, 2).map(|l| l.msg_index), Some(2));
    }

    #[test]
    fn missing_index_yields_none() {
        let logs = vec![log(0)];
        assert!(find_log(&logs, 3).is_none());
        assert!(find_log(&[], 0).is_none());
    }
}
