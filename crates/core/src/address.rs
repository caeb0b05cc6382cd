//! Addresses and the country → state → city cascade.
//!
//! Picking a country invalidates the state and city below it; picking a state
//! invalidates the city. Option lists for each level are fetched for a
//! specific parent, and a list is only accepted while that parent is still the
//! selected one, so a slow lookup cannot overwrite a newer choice.

use serde::{Deserialize, Serialize};

use crate::types::{CityId, CountryId, StateId};

/// An option in one of the location dropdowns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location<Id> {
    pub id: Id,
    pub name: String,
}

pub type Country = Location<CountryId>;
pub type State = Location<StateId>;
pub type City = Location<CityId>;

/// The selected country, state and city together with their display names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationSelection {
    pub country_id: Option<CountryId>,
    pub country_name: String,
    pub state_id: Option<StateId>,
    pub state_name: String,
    pub city_id: Option<CityId>,
    pub city_name: String,
}

impl LocationSelection {
    /// Select a country. Clears state and city whenever the country changes.
    pub fn select_country(&mut self, id: Option<CountryId>, name: impl Into<String>) {
        if self.country_id != id {
            self.clear_state();
        }
        self.country_id = id;
        self.country_name = if id.is_some() { name.into() } else { String::new() };
    }

    /// Select a state. Clears the city whenever the state changes.
    pub fn select_state(&mut self, id: Option<StateId>, name: impl Into<String>) {
        if self.state_id != id {
            self.clear_city();
        }
        self.state_id = id;
        self.state_name = if id.is_some() { name.into() } else { String::new() };
    }

    pub fn select_city(&mut self, id: Option<CityId>, name: impl Into<String>) {
        self.city_id = id;
        self.city_name = if id.is_some() { name.into() } else { String::new() };
    }

    fn clear_state(&mut self) {
        self.state_id = None;
        self.state_name.clear();
        self.clear_city();
    }

    fn clear_city(&mut self) {
        self.city_id = None;
        self.city_name.clear();
    }

    /// Whether a state list fetched for `country` still applies.
    #[must_use]
    pub fn accepts_states_for(&self, country: CountryId) -> bool {
        self.country_id == Some(country)
    }

    /// Whether a city list fetched for `state` still applies.
    #[must_use]
    pub fn accepts_cities_for(&self, state: StateId) -> bool {
        self.state_id == Some(state)
    }

    /// Apply a submitted triple of ids, resolving names from option lists.
    ///
    /// The cascade runs top-down: an id that is not in its level's option
    /// list (for example a state left over from a previous country) is
    /// dropped, and so is everything below it.
    pub fn apply_submitted(
        &mut self,
        submitted: (Option<CountryId>, Option<StateId>, Option<CityId>),
        lists: &LocationLists,
    ) {
        let (country, state, city) = submitted;

        let country = country.and_then(|id| find(&lists.countries, id));
        self.select_country(country.map(|c| c.id), country.map(|c| c.name.clone()).unwrap_or_default());

        let state = match (self.country_id, state) {
            (Some(parent), Some(id)) if lists.states.parent == Some(parent) => {
                find(&lists.states.options, id)
            }
            _ => None,
        };
        self.select_state(state.map(|s| s.id), state.map(|s| s.name.clone()).unwrap_or_default());

        let city = match (self.state_id, city) {
            (Some(parent), Some(id)) if lists.cities.parent == Some(parent) => {
                find(&lists.cities.options, id)
            }
            _ => None,
        };
        self.select_city(city.map(|c| c.id), city.map(|c| c.name.clone()).unwrap_or_default());
    }
}

fn find<Id: PartialEq + Copy>(options: &[Location<Id>], id: Id) -> Option<&Location<Id>> {
    options.iter().find(|o| o.id == id)
}

/// An option list together with the parent it was fetched for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildOptions<Parent, Id> {
    pub parent: Option<Parent>,
    pub options: Vec<Location<Id>>,
}

impl<Parent, Id> Default for ChildOptions<Parent, Id> {
    fn default() -> Self {
        Self {
            parent: None,
            options: Vec::new(),
        }
    }
}

impl<Parent, Id> ChildOptions<Parent, Id> {
    #[must_use]
    pub const fn new(parent: Parent, options: Vec<Location<Id>>) -> Self {
        Self {
            parent: Some(parent),
            options,
        }
    }
}

/// Everything needed to render the three location dropdowns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationLists {
    pub countries: Vec<Country>,
    pub states: ChildOptions<CountryId, StateId>,
    pub cities: ChildOptions<StateId, CityId>,
}

/// A postal address as entered at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub postal_code: String,
    #[serde(flatten)]
    pub location: LocationSelection,
}

impl Address {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }

    /// One-line rendering for the review step.
    #[must_use]
    pub fn one_line(&self) -> String {
        [
            self.address.trim(),
            self.location.city_name.as_str(),
            self.location.state_name.as_str(),
            self.postal_code.trim(),
            self.location.country_name.as_str(),
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selected() -> LocationSelection {
        LocationSelection {
            country_id: Some(CountryId::new(1)),
            country_name: "Canada".to_string(),
            state_id: Some(StateId::new(10)),
            state_name: "Ontario".to_string(),
            city_id: Some(CityId::new(100)),
            city_name: "Toronto".to_string(),
        }
    }

    fn lists() -> LocationLists {
        LocationLists {
            countries: vec![
                Country {
                    id: CountryId::new(1),
                    name: "Canada".to_string(),
                },
                Country {
                    id: CountryId::new(2),
                    name: "Mexico".to_string(),
                },
            ],
            states: ChildOptions::new(
                CountryId::new(1),
                vec![State {
                    id: StateId::new(10),
                    name: "Ontario".to_string(),
                }],
            ),
            cities: ChildOptions::new(
                StateId::new(10),
                vec![City {
                    id: CityId::new(100),
                    name: "Toronto".to_string(),
                }],
            ),
        }
    }

    #[test]
    fn test_select_country_clears_state_and_city() {
        let mut sel = selected();
        sel.select_country(Some(CountryId::new(2)), "Mexico");
        assert_eq!(sel.country_name, "Mexico");
        assert_eq!(sel.state_id, None);
        assert_eq!(sel.state_name, "");
        assert_eq!(sel.city_id, None);
        assert_eq!(sel.city_name, "");
    }

    #[test]
    fn test_reselecting_same_country_keeps_children() {
        let mut sel = selected();
        sel.select_country(Some(CountryId::new(1)), "Canada");
        assert_eq!(sel.state_id, Some(StateId::new(10)));
        assert_eq!(sel.city_id, Some(CityId::new(100)));
    }

    #[test]
    fn test_select_state_clears_city() {
        let mut sel = selected();
        sel.select_state(Some(StateId::new(11)), "Quebec");
        assert_eq!(sel.city_id, None);
        assert_eq!(sel.city_name, "");
        assert_eq!(sel.country_id, Some(CountryId::new(1)));
    }

    #[test]
    fn test_stale_lists_rejected() {
        let mut sel = selected();
        assert!(sel.accepts_states_for(CountryId::new(1)));
        sel.select_country(Some(CountryId::new(2)), "Mexico");
        assert!(!sel.accepts_states_for(CountryId::new(1)));
        assert!(!sel.accepts_cities_for(StateId::new(10)));
    }

    #[test]
    fn test_apply_submitted_resolves_names() {
        let mut sel = LocationSelection::default();
        sel.apply_submitted(
            (
                Some(CountryId::new(1)),
                Some(StateId::new(10)),
                Some(CityId::new(100)),
            ),
            &lists(),
        );
        assert_eq!(sel, selected());
    }

    #[test]
    fn test_apply_submitted_drops_state_from_other_country() {
        let mut sel = LocationSelection::default();
        // State 10 belongs to country 1, but country 2 is submitted.
        sel.apply_submitted(
            (
                Some(CountryId::new(2)),
                Some(StateId::new(10)),
                Some(CityId::new(100)),
            ),
            &lists(),
        );
        assert_eq!(sel.country_name, "Mexico");
        assert_eq!(sel.state_id, None);
        assert_eq!(sel.city_id, None);
    }

    #[test]
    fn test_apply_submitted_unknown_country() {
        let mut sel = selected();
        sel.apply_submitted((Some(CountryId::new(9)), None, None), &lists());
        assert_eq!(sel, LocationSelection::default());
    }

    #[test]
    fn test_one_line() {
        let address = Address {
            first_name: "Ada".to_string(),
            last_name: "Byron".to_string(),
            address: "12 Queen St".to_string(),
            postal_code: "M5H 2N2".to_string(),
            location: selected(),
        };
        assert_eq!(address.full_name(), "Ada Byron");
        assert_eq!(
            address.one_line(),
            "12 Queen St, Toronto, Ontario, M5H 2N2, Canada"
        );
    }
}
