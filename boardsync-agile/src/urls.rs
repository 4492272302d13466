//! Web links for boards and sprints.

fn join(website_url: &str, tail: &str) -> String {
    format!("{}/{}", website_url.trim_end_matches('/'), tail)
}

/// `https://acme.atlassian.net/secure/RapidBoard.jspa?rapidView=28&projectKey=APP`
pub fn board_url(website_url: &str, board_id: u64, project_key: &str) -> String {
    join(
        website_url,
        &format!("secure/RapidBoard.jspa?rapidView={board_id}&projectKey={project_key}"),
    )
}

/// Sprint retrospective report of a closed sprint.
pub fn completed_sprint_url(
    website_url: &str,
    board_id: u64,
    project_key: &str,
    sprint_id: u64,
) -> String {
    join(
        website_url,
        &format!(
            "secure/RapidBoard.jspa?rapidView={board_id}&projectKey={project_key}\
             &view=reporting&chart=sprintRetrospective&sprint={sprint_id}"
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_link() {
        assert_eq!(
            board_url("https://acme.atlassian.net/", 80, "APP"),
            "https://acme.atlassian.net/secure/RapidBoard.jspa?rapidView=80&projectKey=APP"
        );
    }

    #[test]
    fn retrospective_link() {
        assert_eq!(
            completed_sprint_url("https://acme.atlassian.net", 28, "APP", 164),
            "https://acme.atlassian.net/secure/RapidBoard.jspa?rapidView=28&projectKey=APP\
             &view=reporting&chart=sprintRetrospective&sprint=164"
        );
    }
}
