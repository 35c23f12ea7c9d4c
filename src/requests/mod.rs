//! Request descriptors for the registry's four page types
//!
//! Each list page of the registry is reached either by a GET with query
//! parameters or a POST with form fields. Builders here produce a
//! [`PageRequest`] the fetcher can execute, plus a human-readable `target`
//! used in logs and errors. The base URL is configurable so tests can point
//! at a mock server.

use crate::types::{Contest, Course, School, SchoolType};
use url::Url;

/// HTTP method of a page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Everything the fetcher needs for one page round trip
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub method: Method,
    pub url: Url,
    /// Form fields for POST pages; empty for GET pages
    pub form: Vec<(&'static str, String)>,
    /// Human-readable description of what this request targets
    pub target: String,
}

fn page_url(base: &str, contest: &Contest, page: &str) -> Result<Url, url::ParseError> {
    Url::parse(&format!(
        "{}/{}/col{}{}",
        base.trim_end_matches('/'),
        contest.year,
        contest.phase.server_code(),
        page
    ))
}

/// The page listing all schools of one type in a contest
pub fn school_list(
    base: &str,
    contest: &Contest,
    school_type: SchoolType,
) -> Result<PageRequest, url::ParseError> {
    let mut url = page_url(base, contest, "listas.asp")?;
    url.query_pairs_mut()
        .append_pair("CodR", school_type.server_code())
        .append_pair("action", "2");

    Ok(PageRequest {
        method: Method::Get,
        url,
        form: Vec::new(),
        target: format!("school list ({contest}, {school_type})"),
    })
}

/// The page listing the courses a school offered in a contest
pub fn course_list(
    base: &str,
    contest: &Contest,
    school: &School,
) -> Result<PageRequest, url::ParseError> {
    let url = page_url(base, contest, "listaredir.asp")?;

    Ok(PageRequest {
        method: Method::Post,
        url,
        form: vec![
            ("CodEstab", school.code.clone()),
            ("CodR", school.school_type.server_code().to_string()),
            // "Ordered list of candidates"
            ("listagem", "Lista+Ordenada+de+Candidatos".to_string()),
        ],
        target: format!("course list ({contest}, school {school})"),
    })
}

/// The page listing every candidate to a course
pub fn candidate_list(
    base: &str,
    contest: &Contest,
    school: &School,
    course: &Course,
) -> Result<PageRequest, url::ParseError> {
    let mut url = page_url(base, contest, "listaser.asp")?;
    // ids/ide bound the place range shown per page and Mx controls the
    // "next page" button; these fixed values put all candidates on one page
    url.query_pairs_mut()
        .append_pair("CodEstab", &school.code)
        .append_pair("CodCurso", &course.code)
        .append_pair("ids", "1")
        .append_pair("ide", "9999")
        .append_pair("Mx", "0");

    Ok(PageRequest {
        method: Method::Get,
        url,
        form: Vec::new(),
        target: format!("candidate list ({contest}, school {school}, course {course})"),
    })
}

/// The page listing the students accepted into a course
pub fn accepted_list(
    base: &str,
    contest: &Contest,
    school: &School,
    course: &Course,
) -> Result<PageRequest, url::ParseError> {
    let url = page_url(base, contest, "listacol.asp")?;

    Ok(PageRequest {
        method: Method::Post,
        url,
        form: vec![
            ("CodCurso", course.code.clone()),
            ("CodEstab", school.code.clone()),
            ("CodR", school.school_type.server_code().to_string()),
            ("search", "Continuar".to_string()),
        ],
        target: format!("accepted list ({contest}, school {school}, course {course})"),
    })
}
