use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

// ============================================================================
// Rotation Models
// ============================================================================

/// One participant's slot in a channel rotation
///
/// Positions within a channel always form `0..n-1` at commit boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct RotationEntry {
    pub channel_id: String,
    pub user_id: String,
    pub position: i32,
    pub updated_at: DateTime<Utc>,
}

/// Result of a single rotate-by-one
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RotationOutcome {
    /// The channel had no entries; nothing was announced
    Empty,
    /// `announced` was told it is their turn and moved to the tail
    Advanced { announced: String, next: Vec<String> },
}

/// Move the head of a rotation to its tail
///
/// `[u1, u2, ..., un]` becomes `[u2, ..., un, u1]`.
pub fn rotate_left(user_ids: &[String]) -> Vec<String> {
    let mut rotated = user_ids.to_vec();
    if !rotated.is_empty() {
        rotated.rotate_left(1);
    }
    rotated
}

/// Drop repeated ids, keeping each id's first occurrence
pub fn dedup_preserving_order(user_ids: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::with_capacity(user_ids.len());
    user_ids
        .iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_rotate_left_moves_head_to_tail() {
        assert_eq!(rotate_left(&ids(&["A", "B", "C"])), ids(&["B", "C", "A"]));
    }

    #[test]
    fn test_rotate_left_single_and_empty() {
        assert_eq!(rotate_left(&ids(&["A"])), ids(&["A"]));
        assert!(rotate_left(&[]).is_empty());
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        assert_eq!(
            dedup_preserving_order(&ids(&["A", "B", "A", "C", "B"])),
            ids(&["A", "B", "C"])
        );
    }

    #[test]
    fn test_rotation_outcome_serialization() {
        let outcome = RotationOutcome::Advanced {
            announced: "A".to_string(),
            next: ids(&["B", "A"]),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "advanced");
        assert_eq!(json["announced"], "A");
    }
}
