/// Tag ids and their report labels.
///
/// This is a fixed business rule of the reporting workspace. Kept as a
/// table instead of inline literals so the labels can change without
/// touching the pipeline.
const TAG_LABELS: [(i64, &str); 7] = [
    (1, "1 - Communication/Management"),
    (2, "2 - Development"),
    (3, "3 - Development (bug)"),
    (4, "4 - Development (code review)"),
    (5, "5 - QA"),
    (6, "6 - Infrastructure"),
    (7, "7 - UX/UI"),
];

/// Returns the report label for a tag id, or an empty string when the id
/// is not in the table. An unknown id is a gap in the report, not an error.
pub fn label(tag_id: i64) -> &'static str {
    TAG_LABELS
        .iter()
        .find(|(id, _)| *id == tag_id)
        .map(|(_, label)| *label)
        .unwrap_or("")
}
