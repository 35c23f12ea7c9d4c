//! Tri-state hierarchical result store
//!
//! The store mirrors the registry's hierarchy as nested ordered maps:
//! contest -> school -> course -> candidate list. Every level wraps its
//! children in a [`Node`], which distinguishes "known to exist but not yet
//! fetched" from "fully fetched". A key that is missing entirely is simply
//! not yet known. This is what makes repeated runs incremental: a resumed
//! crawl skips everything already fetched but still knows which children
//! remain to be visited.
//!
//! Keys only ever enter a map through a successful fetch of their parent's
//! list page; absent-marked entries are never invented.
//!
//! The whole structure is snapshotted to disk as a single MessagePack blob.

use crate::filter::ContestFilter;
use crate::types::{CandidateEntry, Contest, Course, School};
use crate::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One level of the hierarchy: either a placeholder for data that has not
/// been fetched yet, or the fetched children
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Node<T> {
    /// The key is known to exist (its parent enumerated it) but its own
    /// list page has not been fetched
    NotFetched,
    /// The key's list page was fetched successfully
    Fetched(T),
}

impl<T> Node<T> {
    pub fn is_fetched(&self) -> bool {
        matches!(self, Node::Fetched(_))
    }

    pub fn as_fetched(&self) -> Option<&T> {
        match self {
            Node::Fetched(value) => Some(value),
            Node::NotFetched => None,
        }
    }

    fn as_fetched_mut(&mut self) -> Option<&mut T> {
        match self {
            Node::Fetched(value) => Some(value),
            Node::NotFetched => None,
        }
    }
}

/// Courses of one school, each either pending or carrying its candidate list
pub type CourseCandidates = BTreeMap<Course, Node<Vec<CandidateEntry>>>;

/// Schools of one contest, each either pending or carrying its course map
pub type SchoolCourses = BTreeMap<School, Node<CourseCandidates>>;

/// A path into the store, one variant per hierarchy depth
///
/// Built from references via `From`, so lookups read naturally:
/// `store.contains(&contest)`, `store.contains((&contest, &school))`.
#[derive(Debug, Clone, Copy)]
pub enum StorePath<'a> {
    Contest(&'a Contest),
    School(&'a Contest, &'a School),
    Course(&'a Contest, &'a School, &'a Course),
}

impl<'a> From<&'a Contest> for StorePath<'a> {
    fn from(contest: &'a Contest) -> Self {
        StorePath::Contest(contest)
    }
}

impl<'a> From<(&'a Contest, &'a School)> for StorePath<'a> {
    fn from((contest, school): (&'a Contest, &'a School)) -> Self {
        StorePath::School(contest, school)
    }
}

impl<'a> From<(&'a Contest, &'a School, &'a Course)> for StorePath<'a> {
    fn from((contest, school, course): (&'a Contest, &'a School, &'a Course)) -> Self {
        StorePath::Course(contest, school, course)
    }
}

/// Where a snapshot is written when the configured path fails
pub const FALLBACK_SNAPSHOT_PATH: &str = "dges-harvester-backup.db";

/// The tri-state hierarchical result store
///
/// Small enough to live fully in memory (the original dataset is a few
/// thousand courses), so durability is a whole-structure snapshot rather
/// than per-write persistence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    contests: BTreeMap<Contest, Node<SchoolCourses>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.contests.is_empty()
    }

    /// True iff every level along `path` has been fetched, the final key
    /// included. An absent-marked leaf is *not* contained; use [`known`]
    /// for key-only existence.
    ///
    /// [`known`]: Store::known
    pub fn contains<'a>(&self, path: impl Into<StorePath<'a>>) -> bool {
        match path.into() {
            StorePath::Contest(c) => self.schools_of(c).is_some(),
            StorePath::School(c, s) => self.courses_of(c, s).is_some(),
            StorePath::Course(c, s, k) => self
                .courses_of(c, s)
                .and_then(|courses| courses.get(k))
                .map(Node::is_fetched)
                .unwrap_or(false),
        }
    }

    /// True iff the final key exists at all, fetched or not. Every prefix
    /// key must be fetched, otherwise the final key could not be known.
    pub fn known<'a>(&self, path: impl Into<StorePath<'a>>) -> bool {
        match path.into() {
            StorePath::Contest(c) => self.contests.contains_key(c),
            StorePath::School(c, s) => self
                .schools_of(c)
                .map(|schools| schools.contains_key(s))
                .unwrap_or(false),
            StorePath::Course(c, s, k) => self
                .courses_of(c, s)
                .map(|courses| courses.contains_key(k))
                .unwrap_or(false),
        }
    }

    fn schools_of(&self, contest: &Contest) -> Option<&SchoolCourses> {
        self.contests.get(contest).and_then(Node::as_fetched)
    }

    fn courses_of(&self, contest: &Contest, school: &School) -> Option<&CourseCandidates> {
        self.schools_of(contest)
            .and_then(|schools| schools.get(school))
            .and_then(Node::as_fetched)
    }

    /// Records a successful contest-stage fetch: the contest node is
    /// replaced wholesale with the enumerated schools, all absent-marked.
    pub fn put_contest(&mut self, contest: Contest, schools: impl IntoIterator<Item = School>) {
        let schools = schools
            .into_iter()
            .map(|school| (school, Node::NotFetched))
            .collect();
        self.contests.insert(contest, Node::Fetched(schools));
    }

    /// Records a successful school-stage fetch: the school's node is
    /// replaced with the enumerated courses, all absent-marked.
    ///
    /// The contest must already be fetched; a missing parent is a caller
    /// contract violation and returns [`StoreError::MissingParent`].
    pub fn put_school(
        &mut self,
        contest: &Contest,
        school: &School,
        courses: impl IntoIterator<Item = Course>,
    ) -> Result<(), StoreError> {
        let schools = self
            .contests
            .get_mut(contest)
            .and_then(Node::as_fetched_mut)
            .ok_or_else(|| StoreError::MissingParent {
                path: format!("{contest} / {school}"),
            })?;

        let courses = courses
            .into_iter()
            .map(|course| (course, Node::NotFetched))
            .collect();
        schools.insert(school.clone(), Node::Fetched(courses));
        Ok(())
    }

    /// Records a successful course-stage fetch: the finished candidate list,
    /// in source row order.
    ///
    /// The contest and school must already be fetched.
    pub fn put_course(
        &mut self,
        contest: &Contest,
        school: &School,
        course: &Course,
        candidates: Vec<CandidateEntry>,
    ) -> Result<(), StoreError> {
        let schools = self
            .contests
            .get_mut(contest)
            .and_then(Node::as_fetched_mut)
            .ok_or_else(|| StoreError::MissingParent {
                path: format!("{contest} / {school} / {course}"),
            })?;
        let courses = schools
            .get_mut(school)
            .and_then(Node::as_fetched_mut)
            .ok_or_else(|| StoreError::MissingParent {
                path: format!("{contest} / {school} / {course}"),
            })?;

        courses.insert(course.clone(), Node::Fetched(candidates));
        Ok(())
    }

    /// Every school key enumerated under a fetched contest, absent-marked
    /// ones included. Empty if the contest itself is not fetched.
    pub fn school_keys(&self, contest: &Contest) -> Vec<School> {
        self.schools_of(contest)
            .map(|schools| schools.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Every course key enumerated under a fetched school, absent-marked
    /// ones included
    pub fn course_keys(&self, contest: &Contest, school: &School) -> Vec<Course> {
        self.courses_of(contest, school)
            .map(|courses| courses.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Fetched contests accepted by the filter
    pub fn iter_contests(&self, filter: &dyn ContestFilter) -> Vec<&Contest> {
        let wanted = filter.list_contests();
        self.contests
            .iter()
            .filter(|(contest, node)| {
                node.is_fetched()
                    && wanted
                        .as_ref()
                        .map_or(true, |list| list.contains(contest))
            })
            .map(|(contest, _)| contest)
            .collect()
    }

    /// Fetched schools accepted by the filter, walked top-down (a contest
    /// the filter rejects hides all its schools)
    pub fn iter_schools(&self, filter: &dyn ContestFilter) -> Vec<(&Contest, &School)> {
        let mut result = Vec::new();
        for contest in self.iter_contests(filter) {
            if let Some(schools) = self.schools_of(contest) {
                for (school, node) in schools {
                    if node.is_fetched() && filter.accept_school(contest, school) {
                        result.push((contest, school));
                    }
                }
            }
        }
        result
    }

    /// Fetched courses accepted by the filter, with their candidate lists
    pub fn iter_courses(
        &self,
        filter: &dyn ContestFilter,
    ) -> Vec<(&Contest, &School, &Course, &[CandidateEntry])> {
        let mut result = Vec::new();
        for (contest, school) in self.iter_schools(filter) {
            if let Some(courses) = self.courses_of(contest, school) {
                for (course, node) in courses {
                    if let Some(candidates) = node.as_fetched() {
                        if filter.accept_course(contest, school, course) {
                            result.push((contest, school, course, candidates.as_slice()));
                        }
                    }
                }
            }
        }
        result
    }

    /// Every candidate in every fetched course accepted by the filter
    pub fn iter_candidates(
        &self,
        filter: &dyn ContestFilter,
    ) -> Vec<(&Contest, &School, &Course, &CandidateEntry)> {
        self.iter_courses(filter)
            .into_iter()
            .flat_map(|(contest, school, course, candidates)| {
                candidates
                    .iter()
                    .map(move |candidate| (contest, school, course, candidate))
            })
            .collect()
    }

    /// Serializes the whole store to a MessagePack blob
    pub fn to_bytes(&self) -> Result<Vec<u8>, StoreError> {
        Ok(rmp_serde::to_vec(self)?)
    }

    /// Deserializes a store from a snapshot blob
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, rmp_serde::decode::Error> {
        rmp_serde::from_slice(bytes)
    }

    /// Loads a store from a snapshot file.
    ///
    /// A `None` path or a missing file yields an empty store; a present but
    /// unreadable or corrupt file is an error, never silently discarded.
    pub fn from_cache(path: Option<&Path>) -> Result<Self, StoreError> {
        let path = match path {
            Some(path) if path.is_file() => path,
            _ => return Ok(Self::new()),
        };

        let bytes = std::fs::read(path).map_err(|source| StoreError::SnapshotRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(&bytes).map_err(|source| StoreError::CorruptSnapshot {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Writes a snapshot to `path`; `None` disables caching.
    ///
    /// If the configured path cannot be written, one attempt is made at
    /// [`FALLBACK_SNAPSHOT_PATH`]. Either way the primary failure is
    /// reported, naming every path that was tried.
    pub fn to_cache(&self, path: Option<&Path>) -> Result<(), StoreError> {
        match path {
            Some(path) => self.write_snapshot(path, Path::new(FALLBACK_SNAPSHOT_PATH)),
            None => Ok(()),
        }
    }

    fn write_snapshot(&self, path: &Path, fallback: &Path) -> Result<(), StoreError> {
        let bytes = self.to_bytes()?;

        let primary_err = match std::fs::write(path, &bytes) {
            Ok(()) => return Ok(()),
            Err(err) => err,
        };

        tracing::warn!(
            "failed to write snapshot to {}: {}; trying fallback {}",
            path.display(),
            primary_err,
            fallback.display()
        );

        match std::fs::write(fallback, &bytes) {
            Ok(()) => Err(StoreError::SnapshotFellBack {
                path: path.to_path_buf(),
                fallback: fallback.to_path_buf(),
                source: primary_err,
            }),
            Err(_) => Err(StoreError::SnapshotWrite {
                path: path.to_path_buf(),
                fallback: fallback.to_path_buf(),
                source: primary_err,
            }),
        }
    }
}
