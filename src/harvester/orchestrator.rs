//! Crawl orchestration: three sequential fan-out stages
//!
//! Stage N+1's work set is computed from what stage N wrote into the store,
//! so stages run strictly in order and each stage fully drains before the
//! next starts:
//!
//! 1. contests: fetch each contest's school lists (universities and
//!    polytechnics merged into one task)
//! 2. schools: fetch each accepted school's course list
//! 3. courses: fetch each accepted course's accepted roster and candidate
//!    list, join them, and store the finished candidate list
//!
//! Within a stage, keys already cached in the store count as successful
//! without any network traffic; the rest fan out over a bounded worker
//! pool. A failed task is logged and excluded from the next stage's
//! frontier; it never aborts its siblings and nothing partial is written.

use crate::config::Config;
use crate::filter::ContestFilter;
use crate::harvester::fetcher::{build_http_client, fetch_page};
use crate::harvester::shutdown::ShutdownHandle;
use crate::pages;
use crate::requests;
use crate::store::Store;
use crate::types::{CandidateEntry, Contest, Course, School, SchoolType};
use crate::HarvestError;
use reqwest::Client;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// How one worker task ended
enum TaskOutcome<K> {
    /// Fetched, parsed and written; the key joins the stage's success set
    Done(K),
    /// Fetch, parse or store write failed; logged, key excluded
    Failed,
    /// Shutdown was requested before this task started fetching
    Cancelled,
}

/// Counters for one stage of the crawl
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageReport {
    pub total: usize,
    pub cached: usize,
    pub fetched: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl fmt::Display for StageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} total: {} cached, {} fetched, {} failed, {} cancelled",
            self.total, self.cached, self.fetched, self.failed, self.cancelled
        )
    }
}

/// Summary of one harvest run
#[derive(Debug, Clone, Copy, Default)]
pub struct HarvestReport {
    pub contests: StageReport,
    pub schools: StageReport,
    pub courses: StageReport,
    /// True if a termination signal cut the run short
    pub interrupted: bool,
}

/// Drives the three crawl stages over a shared store and worker pool
pub struct Orchestrator {
    client: Client,
    store: Arc<Mutex<Store>>,
    base_url: String,
    workers: usize,
    shutdown: ShutdownHandle,
}

impl Orchestrator {
    pub fn new(
        config: &Config,
        store: Arc<Mutex<Store>>,
        shutdown: ShutdownHandle,
    ) -> Result<Self, HarvestError> {
        let client = build_http_client(Duration::from_secs(config.harvest.fetch_timeout))
            .map_err(|source| HarvestError::Http {
                target: "HTTP client".to_string(),
                source,
            })?;

        Ok(Self {
            client,
            store,
            base_url: config.harvest.base_url.clone(),
            workers: config.harvest.workers,
            shutdown,
        })
    }

    /// Runs all three stages and reports what happened.
    ///
    /// Returns early (with `interrupted` set) if a shutdown was requested;
    /// the caller owns the single snapshot write on every exit path.
    pub async fn run(&self, filter: &dyn ContestFilter) -> Result<HarvestReport, HarvestError> {
        let mut report = HarvestReport::default();

        // A live harvest cannot discover contest years from the server, so
        // an unbounded filter is a contract violation, not an empty run
        let contests = filter.list_contests().ok_or(HarvestError::UnboundedFilter)?;

        tracing::info!("stage 1/3: school lists for {} contests", contests.len());
        let (successful_contests, stage) = self.contest_stage(contests).await;
        report.contests = stage;
        if self.shutdown.is_shutting_down() {
            report.interrupted = true;
            return Ok(report);
        }

        tracing::info!("stage 2/3: course lists");
        let (successful_schools, stage) = self.school_stage(filter, &successful_contests).await;
        report.schools = stage;
        if self.shutdown.is_shutting_down() {
            report.interrupted = true;
            return Ok(report);
        }

        tracing::info!("stage 3/3: candidate lists");
        let (_, stage) = self.course_stage(filter, &successful_schools).await;
        report.courses = stage;
        report.interrupted = self.shutdown.is_shutting_down();

        Ok(report)
    }

    async fn contest_stage(&self, contests: Vec<Contest>) -> (Vec<Contest>, StageReport) {
        let (cached, to_fetch): (Vec<_>, Vec<_>) = {
            let store = self.store.lock().unwrap();
            contests.into_iter().partition(|c| store.contains(c))
        };

        self.run_stage("contest", cached, to_fetch, |contest| {
            let client = self.client.clone();
            let base = self.base_url.clone();
            let store = Arc::clone(&self.store);
            async move {
                match fetch_contest(&client, &base, &contest).await {
                    Ok(schools) => {
                        store.lock().unwrap().put_contest(contest, schools);
                        TaskOutcome::Done(contest)
                    }
                    Err(err) => {
                        tracing::error!("failed to fetch contest {contest}: {err}");
                        TaskOutcome::Failed
                    }
                }
            }
        })
        .await
    }

    async fn school_stage(
        &self,
        filter: &dyn ContestFilter,
        contests: &[Contest],
    ) -> (Vec<(Contest, School)>, StageReport) {
        let (cached, to_fetch) = {
            let store = self.store.lock().unwrap();
            let mut cached = Vec::new();
            let mut to_fetch = Vec::new();
            for contest in contests {
                for school in store.school_keys(contest) {
                    if !filter.accept_school(contest, &school) {
                        continue;
                    }
                    if store.contains((contest, &school)) {
                        cached.push((*contest, school));
                    } else {
                        to_fetch.push((*contest, school));
                    }
                }
            }
            (cached, to_fetch)
        };

        self.run_stage("school", cached, to_fetch, |(contest, school)| {
            let client = self.client.clone();
            let base = self.base_url.clone();
            let store = Arc::clone(&self.store);
            async move {
                match fetch_school(&client, &base, &contest, &school).await {
                    Ok(courses) => {
                        let result = store.lock().unwrap().put_school(&contest, &school, courses);
                        match result {
                            Ok(()) => TaskOutcome::Done((contest, school)),
                            Err(err) => {
                                tracing::error!(
                                    "failed to store school {contest} / {school}: {err}"
                                );
                                TaskOutcome::Failed
                            }
                        }
                    }
                    Err(err) => {
                        tracing::error!("failed to fetch school {contest} / {school}: {err}");
                        TaskOutcome::Failed
                    }
                }
            }
        })
        .await
    }

    async fn course_stage(
        &self,
        filter: &dyn ContestFilter,
        schools: &[(Contest, School)],
    ) -> (Vec<(Contest, School, Course)>, StageReport) {
        let (cached, to_fetch) = {
            let store = self.store.lock().unwrap();
            let mut cached = Vec::new();
            let mut to_fetch = Vec::new();
            for (contest, school) in schools {
                for course in store.course_keys(contest, school) {
                    if !filter.accept_course(contest, school, &course) {
                        continue;
                    }
                    if store.contains((contest, school, &course)) {
                        cached.push((*contest, school.clone(), course));
                    } else {
                        to_fetch.push((*contest, school.clone(), course));
                    }
                }
            }
            (cached, to_fetch)
        };

        self.run_stage("course", cached, to_fetch, |(contest, school, course)| {
            let client = self.client.clone();
            let base = self.base_url.clone();
            let store = Arc::clone(&self.store);
            async move {
                match fetch_course(&client, &base, &contest, &school, &course).await {
                    Ok(candidates) => {
                        let result = store
                            .lock()
                            .unwrap()
                            .put_course(&contest, &school, &course, candidates);
                        match result {
                            Ok(()) => TaskOutcome::Done((contest, school, course)),
                            Err(err) => {
                                tracing::error!(
                                    "failed to store course {contest} / {school} / {course}: {err}"
                                );
                                TaskOutcome::Failed
                            }
                        }
                    }
                    Err(err) => {
                        tracing::error!(
                            "failed to fetch course {contest} / {school} / {course}: {err}"
                        );
                        TaskOutcome::Failed
                    }
                }
            }
        })
        .await
    }

    /// Shared stage machinery: spawn one task per to-fetch key over the
    /// bounded pool, drain every task in completion order, and fold cached
    /// keys into the success set.
    async fn run_stage<K, F, Fut>(
        &self,
        name: &str,
        cached: Vec<K>,
        to_fetch: Vec<K>,
        make_task: F,
    ) -> (Vec<K>, StageReport)
    where
        K: Send + 'static,
        F: Fn(K) -> Fut,
        Fut: Future<Output = TaskOutcome<K>> + Send + 'static,
    {
        let mut stage = StageReport {
            total: cached.len() + to_fetch.len(),
            cached: cached.len(),
            ..StageReport::default()
        };

        if to_fetch.is_empty() {
            tracing::info!("all needed {name} pages are already cached");
            return (cached, stage);
        }
        tracing::info!(
            "{name} stage: {} cached, {} to fetch",
            cached.len(),
            to_fetch.len()
        );

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();
        for key in to_fetch {
            let semaphore = Arc::clone(&semaphore);
            let shutdown = self.shutdown.clone();
            let work = make_task(key);
            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return TaskOutcome::Cancelled,
                };
                // Submitted but not yet started: bail out on shutdown so
                // only in-flight fetches run to completion
                if shutdown.is_shutting_down() {
                    return TaskOutcome::Cancelled;
                }
                work.await
            });
        }

        let mut successful = cached;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(TaskOutcome::Done(key)) => {
                    stage.fetched += 1;
                    successful.push(key);
                }
                Ok(TaskOutcome::Failed) => stage.failed += 1,
                Ok(TaskOutcome::Cancelled) => stage.cancelled += 1,
                Err(err) => {
                    // A panicking task is isolated like any other failure
                    tracing::error!("{name} task panicked: {err}");
                    stage.failed += 1;
                }
            }
        }

        tracing::info!("{name} stage done ({stage})");
        (successful, stage)
    }
}

/// Fetches both school lists of a contest (universities, then polytechnics)
/// and merges them in that order
async fn fetch_contest(
    client: &Client,
    base: &str,
    contest: &Contest,
) -> Result<Vec<School>, HarvestError> {
    let mut schools = Vec::new();
    for school_type in SchoolType::ALL {
        let request = requests::school_list(base, contest, school_type)?;
        let html = fetch_page(client, &request).await?;
        let parsed = pages::parse_school_list(&html, school_type).map_err(|source| {
            HarvestError::Page {
                target: request.target.clone(),
                source,
            }
        })?;
        schools.extend(parsed);
    }
    Ok(schools)
}

/// Fetches a school's course list
async fn fetch_school(
    client: &Client,
    base: &str,
    contest: &Contest,
    school: &School,
) -> Result<Vec<Course>, HarvestError> {
    let request = requests::course_list(base, contest, school)?;
    let html = fetch_page(client, &request).await?;
    pages::parse_course_list(&html).map_err(|source| HarvestError::Page {
        target: request.target.clone(),
        source,
    })
}

/// Fetches a course's accepted roster and candidate list and joins them.
///
/// Both fetches must succeed; a course is written whole or not at all.
async fn fetch_course(
    client: &Client,
    base: &str,
    contest: &Contest,
    school: &School,
    course: &Course,
) -> Result<Vec<CandidateEntry>, HarvestError> {
    let request = requests::accepted_list(base, contest, school, course)?;
    let html = fetch_page(client, &request).await?;
    let accepted = pages::parse_accepted_list(&html).map_err(|source| HarvestError::Page {
        target: request.target.clone(),
        source,
    })?;

    let request = requests::candidate_list(base, contest, school, course)?;
    let html = fetch_page(client, &request).await?;
    pages::parse_candidate_list(&html, &accepted).map_err(|source| HarvestError::Page {
        target: request.target.clone(),
        source,
    })
}
