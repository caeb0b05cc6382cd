//! Address cascade: state and city `<option>` fragments.
//!
//! Lookups are served under a store slug and answer 404 for unknown stores.
//! Lookup failures never reach the buyer. They are logged and the dropdown
//! is rendered with only its placeholder.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use vitrine_core::{
    City, Country, LocationLists, State as Region,
    address::ChildOptions,
    types::{CountryId, StateId},
};

use crate::error::Result;
use crate::state::AppState;

/// One `<option>` of a location dropdown.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OptionView {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// Option list fragment template.
#[derive(Template, WebTemplate)]
#[template(path = "partials/location_options.html")]
pub struct LocationOptionsTemplate {
    pub placeholder: &'static str,
    /// Parent id the options were fetched for, echoed for stale-response checks.
    pub parent: String,
    pub options: Vec<OptionView>,
}

#[derive(Debug, Deserialize)]
pub struct StatesQuery {
    #[serde(default)]
    pub country_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CitiesQuery {
    #[serde(default)]
    pub state_id: String,
}

/// States of a country, or an empty list if the lookup fails.
pub(crate) async fn states_or_empty(state: &AppState, country: CountryId) -> Vec<Region> {
    state.backend().states(country).await.unwrap_or_else(|e| {
        tracing::warn!(country = %country, error = %e, "State lookup failed");
        Vec::new()
    })
}

/// Cities of a state, or an empty list if the lookup fails.
pub(crate) async fn cities_or_empty(state: &AppState, region: StateId) -> Vec<City> {
    state.backend().cities(region).await.unwrap_or_else(|e| {
        tracing::warn!(state = %region, error = %e, "City lookup failed");
        Vec::new()
    })
}

/// Option lists for a country/state pair. Each child list remembers the
/// parent it was fetched for.
pub(crate) async fn location_lists(
    state: &AppState,
    countries: &[Country],
    country: Option<CountryId>,
    region: Option<StateId>,
) -> LocationLists {
    let states = match country {
        Some(id) => ChildOptions::new(id, states_or_empty(state, id).await),
        None => ChildOptions::default(),
    };
    let cities = match region {
        Some(id) => ChildOptions::new(id, cities_or_empty(state, id).await),
        None => ChildOptions::default(),
    };
    LocationLists {
        countries: countries.to_vec(),
        states,
        cities,
    }
}

/// State `<option>` list for a country.
#[instrument(skip(state))]
pub async fn states(
    State(state): State<AppState>,
    Path(store): Path<String>,
    Query(query): Query<StatesQuery>,
) -> Result<impl IntoResponse> {
    state.backend().store(&store).await?;
    let options = match query.country_id.trim().parse::<CountryId>() {
        Ok(country) => states_or_empty(&state, country)
            .await
            .into_iter()
            .map(|s| OptionView {
                value: s.id.to_string(),
                label: s.name,
                selected: false,
            })
            .collect(),
        Err(_) => Vec::new(),
    };

    Ok(LocationOptionsTemplate {
        placeholder: "Select state",
        parent: query.country_id.trim().to_string(),
        options,
    })
}

/// City `<option>` list for a state.
#[instrument(skip(state))]
pub async fn cities(
    State(state): State<AppState>,
    Path(store): Path<String>,
    Query(query): Query<CitiesQuery>,
) -> Result<impl IntoResponse> {
    state.backend().store(&store).await?;
    let options = match query.state_id.trim().parse::<StateId>() {
        Ok(region) => cities_or_empty(&state, region)
            .await
            .into_iter()
            .map(|c| OptionView {
                value: c.id.to_string(),
                label: c.name,
                selected: false,
            })
            .collect(),
        Err(_) => Vec::new(),
    };

    Ok(LocationOptionsTemplate {
        placeholder: "Select city",
        parent: query.state_id.trim().to_string(),
        options,
    })
}
