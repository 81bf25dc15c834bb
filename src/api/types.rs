use serde::Deserialize;

/// One item from the Hacker News item endpoint: a story, comment, job
/// posting, or poll option. The API omits most fields freely, so everything
/// beyond `id` is optional or defaulted.
///
/// Items are immutable snapshots. A refetch of the same id produces a new
/// value; nothing in the crate mutates an `Item` after deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct Item {
    /// Externally assigned unique id
    pub id: u64,
    /// Id of the parent item, absent for top-level items
    #[serde(default)]
    pub parent: Option<u64>,
    /// Author's username
    #[serde(default)]
    pub by: Option<String>,
    /// Unix creation time; absent or zero means unknown
    #[serde(default)]
    pub time: Option<i64>,
    /// Body text, HTML-bearing for comments and text posts
    #[serde(default)]
    pub text: Option<String>,
    /// Title, present on stories, jobs, and polls
    #[serde(default)]
    pub title: Option<String>,
    /// Story URL
    #[serde(default)]
    pub url: Option<String>,
    /// Points
    #[serde(default)]
    pub score: Option<i64>,
    /// Total comment count as reported by the API (stories and polls only)
    #[serde(default)]
    pub descendants: Option<u64>,
    /// Ids of direct children, in the API's display order
    #[serde(default)]
    pub kids: Vec<u64>,
    /// Item was deleted by its author
    #[serde(default)]
    pub deleted: bool,
    /// Item was killed by moderation or flagging
    #[serde(default)]
    pub dead: bool,
    /// Item kind ("story", "comment", "job", "poll", "pollopt")
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl Item {
    /// Creation time for sorting purposes; unknown maps to zero.
    pub fn created_at(&self) -> i64 {
        self.time.unwrap_or(0)
    }

    /// Deleted or dead items never appear in a built tree and their
    /// descendants are never explored.
    pub fn is_tombstone(&self) -> bool {
        self.deleted || self.dead
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_full_comment() {
        let json = r#"{
            "by": "norvig",
            "id": 2921983,
            "kids": [2922097, 2922429],
            "parent": 2921506,
            "text": "Aw shucks, guys ... you make me blush with your compliments.",
            "time": 1314211127,
            "type": "comment"
        }"#;
        let item: Item = serde_json::from_str(json).unwrap();
        assert_eq!(item.id, 2921983);
        assert_eq!(item.parent, Some(2921506));
        assert_eq!(item.by.as_deref(), Some("norvig"));
        assert_eq!(item.kids, vec![2922097, 2922429]);
        assert!(!item.is_tombstone());
        assert_eq!(item.created_at(), 1314211127);
    }

    #[test]
    fn test_deserialize_sparse_item() {
        let item: Item = serde_json::from_str(r#"{"id": 1, "deleted": true}"#).unwrap();
        assert_eq!(item.id, 1);
        assert!(item.deleted);
        assert!(item.is_tombstone());
        assert!(item.kids.is_empty());
        assert_eq!(item.created_at(), 0);
    }

    #[test]
    fn test_deserialize_null_item() {
        // The item endpoint returns a literal `null` body for unknown ids.
        let item: Option<Item> = serde_json::from_str("null").unwrap();
        assert!(item.is_none());
    }

    #[test]
    fn test_dead_item_is_tombstone() {
        let item: Item = serde_json::from_str(r#"{"id": 7, "dead": true}"#).unwrap();
        assert!(item.is_tombstone());
    }
}
