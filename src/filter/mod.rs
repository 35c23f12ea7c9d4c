//! Filters that prune the crawl frontier
//!
//! A [`ContestFilter`] decides which slice of the registry a run touches:
//! it enumerates the contests to visit and accepts or rejects schools and
//! courses underneath them. Filters compose top-down: a school rejected by
//! [`ContestFilter::accept_school`] prunes every course under it, no matter
//! what [`ContestFilter::accept_course`] would have said.
//!
//! Candidates cannot be filtered individually; a course's candidates all
//! live on one page.

use crate::types::{Contest, Course, Phase, School};

/// Decides which contests, schools and courses a harvest or store walk visits
pub trait ContestFilter {
    /// Enumerates the contests this filter accepts.
    ///
    /// Returns `None` to mean "everything": valid when iterating an existing
    /// store, but a live harvest has no way to discover contest years from
    /// the server, so the orchestrator rejects an unbounded filter up front.
    fn list_contests(&self) -> Option<Vec<Contest>>;

    /// Whether the school's course list should be visited
    fn accept_school(&self, contest: &Contest, school: &School) -> bool;

    /// Whether the course's candidate list should be visited
    fn accept_course(&self, contest: &Contest, school: &School, course: &Course) -> bool;
}

/// Accepts every school and course, either for a fixed set of years (and
/// optionally phases) or unbounded (store iteration only)
#[derive(Debug, Clone)]
pub struct UniversalFilter {
    years: Option<Vec<u16>>,
    phases: Vec<Phase>,
}

impl UniversalFilter {
    /// A filter covering every phase of every given year
    pub fn for_years(years: Vec<u16>) -> Self {
        Self::for_years_and_phases(years, Phase::ALL.to_vec())
    }

    /// A filter covering only the given phases of the given years
    pub fn for_years_and_phases(years: Vec<u16>, phases: Vec<Phase>) -> Self {
        Self {
            years: Some(years),
            phases,
        }
    }

    /// The unbounded variant; only usable for iterating cached data
    pub fn all() -> Self {
        Self {
            years: None,
            phases: Phase::ALL.to_vec(),
        }
    }
}

impl ContestFilter for UniversalFilter {
    fn list_contests(&self) -> Option<Vec<Contest>> {
        // Cartesian product of years and phases
        self.years.as_ref().map(|years| {
            years
                .iter()
                .flat_map(|&year| {
                    self.phases
                        .iter()
                        .map(move |&phase| Contest::new(year, phase))
                })
                .collect()
        })
    }

    fn accept_school(&self, _contest: &Contest, _school: &School) -> bool {
        true
    }

    fn accept_course(&self, _contest: &Contest, _school: &School, _course: &Course) -> bool {
        true
    }
}
