//! Field names of the integrated school dataset.

pub const SCHOOL_NAME: &str = "school_name";
pub const SCHOOL_CODE: &str = "school_code";
pub const REGION: &str = "region";
pub const YEAR: &str = "year";
pub const TOTAL_STUDENTS: &str = "total_students";
pub const DIGITAL_SCORE: &str = "digital_score";
pub const MATH_SCORE: &str = "math_score";
pub const COMPUTER_COUNT: &str = "computer_count";
pub const INTERNET_SPEED: &str = "internet_speed";
pub const SMART_CLASSROOM_COUNT: &str = "smart_classroom_count";
pub const DIGITAL_TEXTBOOK_COUNT: &str = "digital_textbook_count";
pub const CLASS_USAGE_RATE: &str = "class_usage_rate";
pub const STUDENT_USAGE_RATE: &str = "student_usage_rate";
pub const TEACHER_USAGE_RATE: &str = "teacher_usage_rate";
pub const POLICY_STATUS: &str = "policy_status";

/// Every known column, in the order the sample generator writes them.
pub const ALL_FIELDS: [&str; 15] = [
    SCHOOL_NAME,
    SCHOOL_CODE,
    REGION,
    YEAR,
    TOTAL_STUDENTS,
    DIGITAL_SCORE,
    MATH_SCORE,
    COMPUTER_COUNT,
    INTERNET_SPEED,
    SMART_CLASSROOM_COUNT,
    DIGITAL_TEXTBOOK_COUNT,
    CLASS_USAGE_RATE,
    STUDENT_USAGE_RATE,
    TEACHER_USAGE_RATE,
    POLICY_STATUS,
];

/// Digital infrastructure counters, summed for the infrastructure breakdown.
pub const INFRASTRUCTURE_FIELDS: [&str; 4] = [
    COMPUTER_COUNT,
    INTERNET_SPEED,
    SMART_CLASSROOM_COUNT,
    DIGITAL_TEXTBOOK_COUNT,
];

/// Usage rates, averaged for the usage breakdown.
pub const USAGE_FIELDS: [&str; 3] = [CLASS_USAGE_RATE, STUDENT_USAGE_RATE, TEACHER_USAGE_RATE];

/// Whether an observation was taken before or after the policy intervention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyStatus {
    Before,
    After,
}

impl PolicyStatus {
    /// Parse `"before"` / `"after"`, ignoring surrounding whitespace and ASCII case.
    pub fn parse(text: &str) -> Option<PolicyStatus> {
        let text = text.trim();
        if text.eq_ignore_ascii_case("before") {
            Some(PolicyStatus::Before)
        } else if text.eq_ignore_ascii_case("after") {
            Some(PolicyStatus::After)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PolicyStatus::Before => "before",
            PolicyStatus::After => "after",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_status_parsing() {
        assert_eq!(PolicyStatus::parse("before"), Some(PolicyStatus::Before));
        assert_eq!(PolicyStatus::parse(" After "), Some(PolicyStatus::After));
        assert_eq!(PolicyStatus::parse("during"), None);
        assert_eq!(PolicyStatus::After.as_str(), "after");
    }
}
