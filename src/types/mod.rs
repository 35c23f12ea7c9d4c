//! Record types for the placement registry hierarchy
//!
//! These are immutable value types used as map keys throughout the store.
//! Identity follows the registry's own rules: a school is identified by its
//! (type, code) pair within a contest and a course by its code within a
//! school; names are descriptive only and excluded from equality.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A phase of a higher education access contest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    First,
    Second,
    Third,
}

impl Phase {
    /// All phases a contest year can have
    pub const ALL: [Phase; 3] = [Phase::First, Phase::Second, Phase::Third];

    /// The numeric code the registry server uses for this phase in URLs
    pub fn server_code(self) -> u8 {
        match self {
            Phase::First => 1,
            Phase::Second => 2,
            Phase::Third => 3,
        }
    }

    /// Inverse of [`server_code`], for phase numbers from configuration
    ///
    /// [`server_code`]: Phase::server_code
    pub fn from_server_code(code: u8) -> Option<Phase> {
        match code {
            1 => Some(Phase::First),
            2 => Some(Phase::Second),
            3 => Some(Phase::Third),
            _ => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "phase {}", self.server_code())
    }
}

/// A public higher education access contest: one year, one phase
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Contest {
    pub year: u16,
    pub phase: Phase,
}

impl Contest {
    pub fn new(year: u16, phase: Phase) -> Self {
        Self { year, phase }
    }
}

impl fmt::Display for Contest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.year, self.phase)
    }
}

/// The kind of higher education school
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SchoolType {
    University,
    Polytechnic,
}

impl SchoolType {
    /// Both school types, in the order the registry lists them
    pub const ALL: [SchoolType; 2] = [SchoolType::University, SchoolType::Polytechnic];

    /// The string code the registry server uses for this school type
    pub fn server_code(self) -> &'static str {
        match self {
            SchoolType::University => "11",
            SchoolType::Polytechnic => "12",
        }
    }
}

impl fmt::Display for SchoolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchoolType::University => write!(f, "university"),
            SchoolType::Polytechnic => write!(f, "polytechnic"),
        }
    }
}

/// A higher education school
///
/// Identity is the (type, code) pair; `name` is carried for display only and
/// does not participate in equality, ordering or hashing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct School {
    pub school_type: SchoolType,
    pub code: String,
    pub name: String,
}

impl School {
    pub fn new(school_type: SchoolType, code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            school_type,
            code: code.into(),
            name: name.into(),
        }
    }
}

impl PartialEq for School {
    fn eq(&self, other: &Self) -> bool {
        self.school_type == other.school_type && self.code == other.code
    }
}

impl Eq for School {}

impl PartialOrd for School {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for School {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.school_type, &self.code).cmp(&(other.school_type, &other.code))
    }
}

impl Hash for School {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.school_type.hash(state);
        self.code.hash(state);
    }
}

impl fmt::Display for School {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code, self.name)
    }
}

/// A course offered by a school
///
/// Identity is the code within its school; `name` is display only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub code: String,
    pub name: String,
}

impl Course {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

impl PartialEq for Course {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}

impl Eq for Course {}

impl PartialOrd for Course {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Course {
    fn cmp(&self, other: &Self) -> Ordering {
        self.code.cmp(&other.code)
    }
}

impl Hash for Course {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.code.hash(state);
    }
}

impl fmt::Display for Course {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code, self.name)
    }
}

/// One candidate's row in a course's ordered candidate list
///
/// Grades use the registry's 0..=2000 scale. `gov_id` is the partial
/// government ID from the page (first three and last two digits folded into
/// one integer). `accepted` is stamped by cross-referencing the course's
/// accepted-student roster; a candidate can out-grade the cut-off and still
/// be `false` here if they were placed in a higher-ranked option.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateEntry {
    /// Position in the list of candidates, ordered by grade (1-based)
    pub place: u32,
    pub gov_id: u32,
    pub name: String,
    /// The candidate's preference rank for this course (1 to 6)
    pub option: u8,
    pub grade: u16,
    pub grade_exams: u16,
    pub grade_12: u16,
    pub grade_10_11: u16,
    pub accepted: bool,
}
