//! Integration tests for the harvester
//!
//! These tests use wiremock to stand in for the registry server and run
//! the full harvest cycle end-to-end: fetch, parse, store, snapshot.

use dges_harvester::config::{CacheConfig, Config, ContestsConfig, HarvestConfig};
use dges_harvester::filter::{ContestFilter, UniversalFilter};
use dges_harvester::harvester::harvest;
use dges_harvester::store::Store;
use dges_harvester::types::{Contest, Course, Phase, School, SchoolType};
use std::path::PathBuf;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointed at the mock server
fn create_test_config(base_url: &str, snapshot_path: Option<PathBuf>) -> Config {
    Config {
        harvest: HarvestConfig {
            workers: 4,
            fetch_timeout: 5,
            base_url: base_url.to_string(),
        },
        cache: CacheConfig { snapshot_path },
        contests: ContestsConfig {
            years: vec![2023],
            phases: Vec::new(),
        },
    }
}

/// Accepts one contest and only university schools, so polytechnic mocks
/// never need course pages
struct UniversityContest(Contest);

impl ContestFilter for UniversityContest {
    fn list_contests(&self) -> Option<Vec<Contest>> {
        Some(vec![self.0])
    }

    fn accept_school(&self, _: &Contest, school: &School) -> bool {
        school.school_type == SchoolType::University
    }

    fn accept_course(&self, _: &Contest, _: &School, _: &Course) -> bool {
        true
    }
}

/// Like [`UniversityContest`] but pinned to a single school code
struct SingleSchool(Contest, String);

impl ContestFilter for SingleSchool {
    fn list_contests(&self) -> Option<Vec<Contest>> {
        Some(vec![self.0])
    }

    fn accept_school(&self, _: &Contest, school: &School) -> bool {
        school.code == self.1
    }

    fn accept_course(&self, _: &Contest, _: &School, _: &Course) -> bool {
        true
    }
}

fn option_page(entries: &[(&str, &str)]) -> String {
    let options: String = entries
        .iter()
        .map(|(code, name)| format!(r#"<option value="{code}">{code} - {name}</option>"#))
        .collect();
    format!("<html><body><form><select>{options}</select></form></body></html>")
}

fn results_page(rows: &str) -> String {
    format!(
        r#"<html><body>
        <div class="caixa">navigation</div>
        <div class="caixa"><table><tbody>{rows}</tbody></table></div>
        </body></html>"#
    )
}

const CANDIDATE_ROWS: &str = r#"
    <tr><td>1</td><td>123(...)45</td><td>Ana Silva</td><td>185,5</td>
        <td>1</td><td>190,0</td><td>180</td><td>175</td></tr>
    <tr><td>2</td><td>987(...)65</td><td>Bruno Costa</td><td>170,0</td>
        <td>3</td><td>165,5</td><td>168</td><td>172</td></tr>"#;

const ACCEPTED_ROWS: &str = "<tr><td>123(...)45</td><td>Ana Silva</td></tr>";

/// Mounts every page of a small registry: one contest, two universities
/// (0300 with course 9361, 0400 with course 9362) and one polytechnic
/// (3030, never visited past its listing). Each page is expected to be
/// fetched exactly `times` times across the server's lifetime.
async fn mount_registry(server: &MockServer, times: u64) {
    Mock::given(method("GET"))
        .and(path("/2023/col1listas.asp"))
        .and(query_param("CodR", "11"))
        .respond_with(ResponseTemplate::new(200).set_body_string(option_page(&[
            ("0300", "Universidade do Minho"),
            ("0400", "Universidade do Porto"),
        ])))
        .expect(times)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/2023/col1listas.asp"))
        .and(query_param("CodR", "12"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(option_page(&[("3030", "Instituto Politécnico do Porto")])),
        )
        .expect(times)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/2023/col1listaredir.asp"))
        .and(body_string_contains("CodEstab=0300"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(option_page(&[("9361", "Engenharia Informática")])),
        )
        .expect(times)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/2023/col1listaredir.asp"))
        .and(body_string_contains("CodEstab=0400"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(option_page(&[("9362", "Medicina")])),
        )
        .expect(times)
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/2023/col1listacol.asp"))
        .and(body_string_contains("CodCurso=9361"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(ACCEPTED_ROWS)))
        .expect(times)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/2023/col1listaser.asp"))
        .and(query_param("CodCurso", "9361"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(CANDIDATE_ROWS)))
        .expect(times)
        .mount(server)
        .await;

    // Course 9362 had nobody placed and nobody applying
    Mock::given(method("POST"))
        .and(path("/2023/col1listacol.asp"))
        .and(body_string_contains("CodCurso=9362"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<div class="caixa">não teve colocados</div>"#),
        )
        .expect(times)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/2023/col1listaser.asp"))
        .and(query_param("CodCurso", "9362"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<div class="caixa">não teve candidatos</div>"#),
        )
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_harvest_end_to_end() {
    let server = MockServer::start().await;
    mount_registry(&server, 1).await;

    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("snapshot.db");
    let config = create_test_config(&server.uri(), Some(snapshot.clone()));

    let contest = Contest::new(2023, Phase::First);
    let report = harvest(&config, &UniversityContest(contest)).await.unwrap();

    assert!(!report.interrupted);
    assert_eq!(report.contests.total, 1);
    assert_eq!(report.contests.fetched, 1);
    // The polytechnic school is listed but filtered out of the school stage
    assert_eq!(report.schools.total, 2);
    assert_eq!(report.schools.fetched, 2);
    assert_eq!(report.courses.total, 2);
    assert_eq!(report.courses.fetched, 2);
    assert_eq!(report.courses.failed, 0);

    // The snapshot on disk holds everything the run fetched
    assert!(snapshot.is_file());
    let store = Store::from_cache(Some(&snapshot)).unwrap();

    let minho = School::new(SchoolType::University, "0300", "Universidade do Minho");
    let porto = School::new(SchoolType::University, "0400", "Universidade do Porto");
    let polytechnic = School::new(SchoolType::Polytechnic, "3030", "IPP");
    let course = Course::new("9361", "Engenharia Informática");

    assert!(store.contains(&contest));
    assert!(store.contains((&contest, &minho, &course)));
    assert!(store.contains((&contest, &porto)));
    // Known from the contest listing, never fetched
    assert!(store.known((&contest, &polytechnic)));
    assert!(!store.contains((&contest, &polytechnic)));

    // Candidate rows survive in page order with the accepted roster applied
    let courses = store.iter_courses(&UniversalFilter::all());
    let (_, _, _, candidates) = courses
        .iter()
        .find(|(_, _, found, _)| **found == course)
        .unwrap();
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].name, "Ana Silva");
    assert_eq!(candidates[0].grade, 1855);
    assert!(candidates[0].accepted);
    assert_eq!(candidates[1].name, "Bruno Costa");
    assert!(!candidates[1].accepted);

    // The empty course is cached as fetched-and-empty, not absent
    let empty = Course::new("9362", "Medicina");
    assert!(store.contains((&contest, &porto, &empty)));
}

#[tokio::test]
async fn test_second_run_fetches_nothing() {
    let server = MockServer::start().await;
    // Every page may be hit exactly once across BOTH runs; the second run
    // must be served entirely from the snapshot. Verified on server drop.
    mount_registry(&server, 1).await;

    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("snapshot.db");
    let config = create_test_config(&server.uri(), Some(snapshot));

    let contest = Contest::new(2023, Phase::First);
    let first = harvest(&config, &UniversityContest(contest)).await.unwrap();
    assert_eq!(first.courses.fetched, 2);

    let second = harvest(&config, &UniversityContest(contest)).await.unwrap();
    assert_eq!(second.contests.cached, 1);
    assert_eq!(second.schools.cached, 2);
    assert_eq!(second.courses.cached, 2);
    assert_eq!(second.contests.fetched, 0);
    assert_eq!(second.schools.fetched, 0);
    assert_eq!(second.courses.fetched, 0);
}

#[tokio::test]
async fn test_failed_course_leaves_sibling_intact() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/2023/col1listas.asp"))
        .and(query_param("CodR", "11"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(option_page(&[("0300", "Universidade do Minho")])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/2023/col1listas.asp"))
        .and(query_param("CodR", "12"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(option_page(&[("3030", "IPP")])),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/2023/col1listaredir.asp"))
        .and(body_string_contains("CodEstab=0300"))
        .respond_with(ResponseTemplate::new(200).set_body_string(option_page(&[
            ("9361", "Engenharia Informática"),
            ("9362", "Medicina"),
        ])))
        .mount(&server)
        .await;

    // 9361 works end to end
    Mock::given(method("POST"))
        .and(path("/2023/col1listacol.asp"))
        .and(body_string_contains("CodCurso=9361"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(ACCEPTED_ROWS)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/2023/col1listaser.asp"))
        .and(query_param("CodCurso", "9361"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(CANDIDATE_ROWS)))
        .mount(&server)
        .await;

    // 9362's accepted page errors out; its candidate page must then never
    // be fetched and nothing partial may land in the store
    Mock::given(method("POST"))
        .and(path("/2023/col1listacol.asp"))
        .and(body_string_contains("CodCurso=9362"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/2023/col1listaser.asp"))
        .and(query_param("CodCurso", "9362"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(CANDIDATE_ROWS)))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let snapshot = dir.path().join("snapshot.db");
    let config = create_test_config(&server.uri(), Some(snapshot.clone()));

    let contest = Contest::new(2023, Phase::First);
    let report = harvest(&config, &UniversityContest(contest)).await.unwrap();

    assert_eq!(report.courses.total, 2);
    assert_eq!(report.courses.fetched, 1);
    assert_eq!(report.courses.failed, 1);

    // The snapshot is still written and the failed course stays re-fetchable
    let store = Store::from_cache(Some(&snapshot)).unwrap();
    let school = School::new(SchoolType::University, "0300", "Universidade do Minho");
    let good = Course::new("9361", "Engenharia Informática");
    let bad = Course::new("9362", "Medicina");

    assert!(store.contains((&contest, &school, &good)));
    assert!(store.known((&contest, &school, &bad)));
    assert!(!store.contains((&contest, &school, &bad)));
}

#[tokio::test]
async fn test_rejected_school_is_never_visited() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/2023/col1listas.asp"))
        .and(query_param("CodR", "11"))
        .respond_with(ResponseTemplate::new(200).set_body_string(option_page(&[
            ("0300", "Universidade do Minho"),
            ("0400", "Universidade do Porto"),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/2023/col1listas.asp"))
        .and(query_param("CodR", "12"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(option_page(&[("3030", "IPP")])),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/2023/col1listaredir.asp"))
        .and(body_string_contains("CodEstab=0300"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(option_page(&[("9361", "Engenharia Informática")])),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/2023/col1listacol.asp"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(ACCEPTED_ROWS)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/2023/col1listaser.asp"))
        .respond_with(ResponseTemplate::new(200).set_body_string(results_page(CANDIDATE_ROWS)))
        .mount(&server)
        .await;

    // The rejected school's course list must never be requested
    Mock::given(method("POST"))
        .and(path("/2023/col1listaredir.asp"))
        .and(body_string_contains("CodEstab=0400"))
        .respond_with(ResponseTemplate::new(200).set_body_string(option_page(&[("1", "X")])))
        .expect(0)
        .mount(&server)
        .await;

    // Caching disabled: no snapshot-path, nothing on disk afterwards
    let config = create_test_config(&server.uri(), None);
    let contest = Contest::new(2023, Phase::First);
    let filter = SingleSchool(contest, "0300".to_string());

    let report = harvest(&config, &filter).await.unwrap();
    assert_eq!(report.schools.total, 1);
    assert_eq!(report.schools.fetched, 1);
    assert_eq!(report.courses.total, 1);
    assert_eq!(report.courses.fetched, 1);
}
