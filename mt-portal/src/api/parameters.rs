//! Datafile metadata panel
//!
//! Parameter sets are sorted per schema family before rendering; see
//! `mt_common::params`.

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue},
    response::Html,
    Json,
};
use mt_common::db::{DatafileRepository, ParameterSet};
use mt_common::params::SchemaClassifier;
use mt_common::thumbnail::ThumbnailSize;
use mt_common::Error;
use serde::Serialize;
use std::fmt::Write;

use super::ApiError;
use crate::AppState;

/// Ingest rewrites parameters and thumbnails in place
const NEVER_CACHE: &str = "no-cache, no-store, must-revalidate, max-age=0";

type Uncached<T> = ([(header::HeaderName, HeaderValue); 1], T);

fn uncached<T>(body: T) -> Uncached<T> {
    ([(header::CACHE_CONTROL, HeaderValue::from_static(NEVER_CACHE))], body)
}

/// Sorted parameter sets of one datafile
#[derive(Debug, Serialize)]
pub struct ParametersResponse {
    pub datafile_id: i64,
    /// URL of the small thumbnail, when one has been generated
    pub thumbnail: Option<String>,
    pub parameter_sets: Vec<ParameterSet>,
}

/// GET /ajax/parameters/:datafile_id
///
/// HTML fragment for the datafile detail pane.
pub async fn retrieve_parameters(
    State(state): State<AppState>,
    Path(datafile_id): Path<i64>,
) -> Result<Uncached<Html<String>>, ApiError> {
    let response = load_parameters(&state, datafile_id).await?;
    Ok(uncached(Html(render_fragment(&response))))
}

/// GET /api/datafile/:datafile_id/parameters
pub async fn parameters_json(
    State(state): State<AppState>,
    Path(datafile_id): Path<i64>,
) -> Result<Uncached<Json<ParametersResponse>>, ApiError> {
    Ok(uncached(Json(load_parameters(&state, datafile_id).await?)))
}

async fn load_parameters(state: &AppState, datafile_id: i64) -> Result<ParametersResponse, ApiError> {
    if state.store.get_datafile(datafile_id).await?.is_none() {
        return Err(Error::NotFound(format!("Datafile {}", datafile_id)).into());
    }

    let classifier = SchemaClassifier::resolve(
        &state.store,
        &state.settings.spectrum_schema_name,
        &state.settings.exif_schema_suffix,
    )
    .await?;

    let sets = state.store.parameter_sets(datafile_id).await?;
    let parameter_sets = classifier.sort_sets(sets);

    let thumbnail = state
        .thumbnails
        .path_for(datafile_id, ThumbnailSize::Small)
        .is_file()
        .then(|| format!("/thumbnails/small/{}", datafile_id));

    Ok(ParametersResponse {
        datafile_id,
        thumbnail,
        parameter_sets,
    })
}

fn render_fragment(response: &ParametersResponse) -> String {
    let mut html = String::new();
    let _ = writeln!(
        html,
        r#"<div class="datafile-parameters" data-datafile-id="{}">"#,
        response.datafile_id
    );

    if let Some(src) = &response.thumbnail {
        let _ = writeln!(
            html,
            r#"  <a href="/thumbnail/{id}"><img class="thumbnail" src="{src}" alt="datafile {id}"></a>"#,
            id = response.datafile_id,
            src = escape_html(src),
        );
    }

    if response.parameter_sets.is_empty() {
        html.push_str("  <p class=\"no-parameters\">No metadata recorded for this datafile.</p>\n");
    }

    for set in &response.parameter_sets {
        let _ = writeln!(html, r#"  <table class="parameterset">"#);
        let _ = writeln!(
            html,
            r#"    <caption title="{}">{}</caption>"#,
            escape_html(&set.schema.namespace),
            escape_html(&set.schema.name)
        );
        for parameter in &set.parameters {
            let value = match &parameter.units {
                Some(units) => format!("{} {}", parameter.value, units),
                None => parameter.value.to_string(),
            };
            let _ = writeln!(
                html,
                "    <tr><th>{}</th><td>{}</td></tr>",
                escape_html(&parameter.full_name),
                escape_html(&value)
            );
        }
        html.push_str("  </table>\n");
    }

    html.push_str("</div>\n");
    html
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
