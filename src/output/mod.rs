//! Statistics and run reporting
//!
//! This module summarizes what a store snapshot contains and what a
//! harvest run did, for display on stdout.

use crate::filter::UniversalFilter;
use crate::harvester::HarvestReport;
use crate::store::Store;

/// Summary of a store snapshot's contents
#[derive(Debug, Clone, Default)]
pub struct StoreStatistics {
    /// Contests whose school lists have been fetched
    pub contests: usize,

    /// Schools known to exist across all fetched contests
    pub schools_known: usize,

    /// Schools whose course lists have been fetched
    pub schools_fetched: usize,

    /// Courses known to exist across all fetched schools
    pub courses_known: usize,

    /// Courses whose candidate lists have been fetched
    pub courses_fetched: usize,

    /// Candidates across all fetched courses
    pub candidates: usize,

    /// Candidates that were accepted into the course they appear under
    pub accepted: usize,
}

/// Walks the whole store and counts what it holds at every level
pub fn load_statistics(store: &Store) -> StoreStatistics {
    let everything = UniversalFilter::all();
    let mut stats = StoreStatistics::default();

    for contest in store.iter_contests(&everything) {
        stats.contests += 1;
        for school in store.school_keys(contest) {
            stats.schools_known += 1;
            if !store.contains((contest, &school)) {
                continue;
            }
            stats.schools_fetched += 1;
            for course in store.course_keys(contest, &school) {
                stats.courses_known += 1;
                if store.contains((contest, &school, &course)) {
                    stats.courses_fetched += 1;
                }
            }
        }
    }

    for (_, _, _, candidate) in store.iter_candidates(&everything) {
        stats.candidates += 1;
        if candidate.accepted {
            stats.accepted += 1;
        }
    }

    stats
}

/// Prints snapshot statistics to stdout in a formatted manner
pub fn print_statistics(stats: &StoreStatistics) {
    println!("=== Snapshot Statistics ===\n");

    println!("Contests fetched: {}", stats.contests);
    println!(
        "Schools: {} fetched / {} known",
        stats.schools_fetched, stats.schools_known
    );
    println!(
        "Courses: {} fetched / {} known",
        stats.courses_fetched, stats.courses_known
    );
    println!(
        "Candidates: {} ({} accepted)",
        stats.candidates, stats.accepted
    );

    let coverage = if stats.courses_known > 0 {
        (stats.courses_fetched as f64 / stats.courses_known as f64) * 100.0
    } else {
        0.0
    };
    println!("\nCourse coverage: {coverage:.1}%");
}

/// Prints a harvest run report to stdout
pub fn print_report(report: &HarvestReport) {
    println!("=== Harvest Report ===\n");

    println!("Contests: {}", report.contests);
    println!("Schools:  {}", report.schools);
    println!("Courses:  {}", report.courses);

    if report.interrupted {
        println!("\nRun was interrupted; progress so far has been saved.");
    }
}
