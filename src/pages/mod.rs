//! HTML field extraction for the registry's page types
//!
//! Four page shapes exist: two option lists (schools per contest, courses
//! per school) and two result tables (candidates per course, accepted
//! students per course). The markup is old and loose; parsing leans on the
//! html5ever-backed [`scraper`] parser, which recovers the unclosed tags the
//! registry serves.
//!
//! A page carrying the server's rate-limit notice ("número de pedidos")
//! always maps to [`PageError::TooManyRequests`], whatever else it contains.

use crate::types::{CandidateEntry, Course, School, SchoolType};
use crate::PageError;
use scraper::{ElementRef, Html, Selector};

type PageResult<T> = Result<T, PageError>;

/// Sentinel text on candidate pages for courses nobody applied to
const NO_CANDIDATES: &str = "não teve candidatos";
/// Sentinel text on accepted pages for courses nobody was placed into
const NO_PLACED: &str = "não teve colocados";
/// Generic "this page has no data" sentinel
const NO_DATA: &str = "não contém dados";

fn selector(css: &'static str) -> PageResult<Selector> {
    Selector::parse(css).map_err(|_| PageError::InvalidPage(format!("bad selector: {css}")))
}

/// Removes untrimmed whitespace and stray tabs/newlines the registry embeds
/// inside text nodes
fn sanitize(text: &str) -> String {
    text.trim().chars().filter(|c| !matches!(c, '\t' | '\n')).collect()
}

fn detect_too_many_requests(html: &str) -> PageResult<()> {
    // Translation: "number of requests"
    if html.contains("número de pedidos") {
        return Err(PageError::TooManyRequests);
    }
    Ok(())
}

/// Folds a partial government ID of the form `XXX(...)XX` into the integer
/// `XXXXX`
fn extract_id(id: &str) -> PageResult<u32> {
    let invalid = || PageError::InvalidPage(format!("invalid ID number: \"{id}\""));

    let index = id.find("(...)").ok_or_else(invalid)?;
    let folded = format!("{}{}", &id[..index], &id[index + 5..]);
    folded.parse().map_err(|_| invalid())
}

/// Grades shown with a decimal comma (final and exam averages); scaled to
/// the registry's 0..=2000 integer range
fn extract_decimal_grade(grade: &str) -> PageResult<u16> {
    grade
        .replace(',', ".")
        .parse::<f64>()
        .map(|value| (value * 10.0) as u16)
        .map_err(|_| PageError::InvalidPage(format!("invalid decimal grade: \"{grade}\"")))
}

/// Grades shown as integers (12th and 10th/11th grade averages); scaled to
/// the 0..=2000 range
fn extract_integer_grade(grade: &str) -> PageResult<u16> {
    grade
        .parse::<u16>()
        .map(|value| value * 10)
        .map_err(|_| PageError::InvalidPage(format!("invalid integer grade: \"{grade}\"")))
}

/// An option's visible text is "CODE - Name"; returns the name
fn strip_code_prefix(text: &str) -> PageResult<String> {
    let text = sanitize(text);
    let dash = text
        .find('-')
        .ok_or_else(|| PageError::InvalidPage(format!("invalid school / course name: \"{text}\"")))?;
    text.get(dash + 2..)
        .map(str::to_string)
        .ok_or_else(|| PageError::InvalidPage(format!("invalid school / course name: \"{text}\"")))
}

/// Scrapes a page where the user picks the next page to visit: used for
/// school lists and course lists. Yields (code, name) pairs in page order.
fn parse_option_list(html: &str) -> PageResult<Vec<(String, String)>> {
    detect_too_many_requests(html)?;

    let document = Html::parse_document(html);
    let options = selector("option")?;

    let mut entries = Vec::new();
    for element in document.select(&options) {
        let code = element
            .value()
            .attr("value")
            .ok_or_else(|| PageError::InvalidPage("option without a value".to_string()))?
            .to_string();
        let name = strip_code_prefix(&element.text().collect::<String>())?;
        entries.push((code, name));
    }

    if entries.is_empty() {
        return Err(PageError::EmptyResult("no options listed".to_string()));
    }
    Ok(entries)
}

/// Scrapes a school list page.
///
/// The page itself does not say whether its schools are universities or
/// polytechnics; that comes from the request that fetched it, so the caller
/// supplies it.
pub fn parse_school_list(html: &str, school_type: SchoolType) -> PageResult<Vec<School>> {
    Ok(parse_option_list(html)?
        .into_iter()
        .map(|(code, name)| School::new(school_type, code, name))
        .collect())
}

/// Scrapes a course list page
pub fn parse_course_list(html: &str) -> PageResult<Vec<Course>> {
    Ok(parse_option_list(html)?
        .into_iter()
        .map(|(code, name)| Course::new(code, name))
        .collect())
}

/// The last "caixa" box on a results page holds the table of interest
fn results_table<'a>(document: &'a Html) -> PageResult<ElementRef<'a>> {
    let boxes = selector(".caixa")?;
    document
        .select(&boxes)
        .last()
        .ok_or_else(|| PageError::InvalidPage("results box not found".to_string()))
}

fn table_rows<'a>(table: &ElementRef<'a>) -> PageResult<Vec<Vec<String>>> {
    let rows = selector("tbody tr")?;
    let cells = selector("td")?;

    Ok(table
        .select(&rows)
        .map(|row| {
            row.select(&cells)
                .map(|cell| sanitize(&cell.text().collect::<String>()))
                .collect()
        })
        .collect())
}

/// Scrapes the roster of students accepted into a course, as
/// (partial government ID, name) pairs
pub fn parse_accepted_list(html: &str) -> PageResult<Vec<(u32, String)>> {
    detect_too_many_requests(html)?;

    let document = Html::parse_document(html);
    let table = results_table(&document)?;

    let text: String = table.text().collect();
    if text.contains(NO_PLACED) || text.contains(NO_DATA) {
        return Ok(Vec::new());
    }

    let mut accepted = Vec::new();
    for row in table_rows(&table)? {
        if row.len() != 2 {
            return Err(PageError::InvalidPage(format!(
                "accepted row has {} columns, expected 2",
                row.len()
            )));
        }
        accepted.push((extract_id(&row[0])?, row[1].clone()));
    }

    if accepted.is_empty() {
        return Err(PageError::EmptyResult("no accepted rows".to_string()));
    }
    Ok(accepted)
}

/// Scrapes the full ordered candidate list of a course, stamping each
/// entry's `accepted` flag by (government ID, name) membership in the
/// course's accepted roster.
///
/// Row order from the page is preserved exactly.
pub fn parse_candidate_list(
    html: &str,
    accepted: &[(u32, String)],
) -> PageResult<Vec<CandidateEntry>> {
    detect_too_many_requests(html)?;

    let document = Html::parse_document(html);
    let table = results_table(&document)?;

    let text: String = table.text().collect();
    if text.contains(NO_CANDIDATES) || text.contains(NO_DATA) {
        return Ok(Vec::new());
    }

    let mut candidates = Vec::new();
    for row in table_rows(&table)? {
        candidates.push(parse_candidate_row(&row, accepted)?);
    }

    if candidates.is_empty() {
        return Err(PageError::EmptyResult("no candidate rows".to_string()));
    }
    Ok(candidates)
}

fn parse_candidate_row(row: &[String], accepted: &[(u32, String)]) -> PageResult<CandidateEntry> {
    if row.len() != 8 {
        return Err(PageError::InvalidPage(format!(
            "candidate row has {} columns, expected 8",
            row.len()
        )));
    }

    let place = row[0]
        .parse()
        .map_err(|_| PageError::InvalidPage(format!("invalid candidate place: \"{}\"", row[0])))?;
    let gov_id = extract_id(&row[1])?;
    let name = row[2].clone();
    let grade = extract_decimal_grade(&row[3])?;
    let option = row[4]
        .parse()
        .map_err(|_| PageError::InvalidPage(format!("invalid candidate option: \"{}\"", row[4])))?;
    let grade_exams = extract_decimal_grade(&row[5])?;
    let grade_12 = extract_integer_grade(&row[6])?;
    let grade_10_11 = extract_integer_grade(&row[7])?;

    let is_accepted = accepted
        .iter()
        .any(|(id, accepted_name)| *id == gov_id && *accepted_name == name);

    Ok(CandidateEntry {
        place,
        gov_id,
        name,
        option,
        grade,
        grade_exams,
        grade_12,
        grade_10_11,
        accepted: is_accepted,
    })
}
