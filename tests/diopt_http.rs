use assert_matches::assert_matches;
use httpmock::prelude::*;

use flyfetch::config::FetchConfig;
use flyfetch::diopt::{self, DioptHttpClient};
use flyfetch::domain::Organism;
use flyfetch::error::FetchError;

const PAGE: &str = r#"
    <html><body>
    <table>
      <tr><td></td><td></td></tr>
      <tr><th>Fly Gene</th><th>Mouse Gene</th></tr>
      <tr><td>so</td><td>Six1</td></tr>
    </table>
    </body></html>"#;

fn client_for(server: &MockServer) -> DioptHttpClient {
    let config = FetchConfig {
        diopt_base_url: server.base_url(),
        ..FetchConfig::default()
    }
    .with_timeout_secs(5);
    DioptHttpClient::new(&config).unwrap()
}

#[test]
fn ortholog_fetch_sends_fixed_and_variable_params() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .query_param("gene_list", "FBgn0000099")
            .query_param("input_species", "7227")
            .query_param("output_species", "10090")
            .query_param("search_datasets", "All (max score = 10)")
            .query_param("search_fields", "FLYBASE")
            .query_param("additional_filter", "None");
        then.status(200).body(PAGE);
    });

    let client = client_for(&server);
    let id = "FBgn0000099".parse().unwrap();
    let table = diopt::fetch_orthologs(&client, &id, Organism::Mouse).unwrap();

    mock.assert();
    assert_eq!(table.columns, vec!["Fly Gene", "Mouse Gene"]);
    assert_eq!(table.rows, vec![vec!["so".to_string(), "Six1".to_string()]]);
}

#[test]
fn http_error_surfaces_as_fetch_failure() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET);
        then.status(404).body("not here");
    });

    let client = client_for(&server);
    let id = "FBgn0000099".parse().unwrap();
    let err = diopt::fetch_orthologs(&client, &id, Organism::Human).unwrap_err();
    assert_matches!(err, FetchError::FetchFailed { .. });
}

#[test]
fn page_without_data_rows_is_empty_result() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET);
        then.status(200)
            .body("<table><tr><th>Fly Gene</th></tr></table>");
    });

    let client = client_for(&server);
    let id = "FBgn0000099".parse().unwrap();
    let err = diopt::fetch_orthologs(&client, &id, Organism::Human).unwrap_err();
    assert_matches!(err, FetchError::EmptyResult(_));
}
