//! Checkout route handlers.
//!
//! The three steps share one page and one session-held [`CheckoutState`].
//! Every POST either redirects back to `GET /checkout` (Post/Redirect/Get) or
//! re-renders the page with field errors and a 422 status.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use vitrine_core::{
    Address, CheckoutError, CheckoutState, CheckoutStep, ContactDetails, Country,
    FieldErrors, LocationLists, LocationSelection, PaymentDetails, PaymentMethod,
    ShippingDetails, ShippingMethod,
    types::{CityId, CountryId, ShippingMethodId, StateId},
};

use crate::backend::types::{CheckoutProps, CouponRequest};
use crate::backend::{Attachment, BackendError};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::CspNonce;
use crate::models::session;
use crate::payments::{self, HiddenForm, OrderSubmission, Submission};
use crate::routes::locations::{OptionView, location_lists};
use crate::routes::{StoreContext, sentence};
use crate::state::AppState;
use crate::views::{CartView, StoreView, SummaryView};

/// Multipart field carrying the bank-transfer receipt.
pub const RECEIPT_FIELD: &str = "payment_receipt";

const COUPON_UNAVAILABLE: &str = "We could not check this coupon right now. Please try again.";

// =============================================================================
// View Types
// =============================================================================

/// A text input on the shipping step.
#[derive(Clone, Debug)]
pub struct FieldView {
    pub name: String,
    pub label: &'static str,
    pub value: String,
    pub kind: &'static str,
    pub autocomplete: &'static str,
    pub error: Option<String>,
}

/// A cascading location dropdown.
#[derive(Clone, Debug)]
pub struct SelectView {
    pub name: String,
    pub label: &'static str,
    pub placeholder: &'static str,
    pub options: Vec<OptionView>,
    pub error: Option<String>,
    /// Fragment URL fetched with the selected value appended.
    pub cascade_url: Option<String>,
    /// Dropdown receiving the fetched options.
    pub cascade_target: Option<String>,
    /// Dropdown emptied when this one changes.
    pub cascade_reset: Option<String>,
}

/// Name, street and location inputs for one address.
#[derive(Clone, Debug)]
pub struct AddressFormView {
    pub fields: Vec<FieldView>,
    pub locations: Vec<SelectView>,
}

/// A shipping method radio option.
#[derive(Clone, Debug)]
pub struct ShippingOptionView {
    pub id: String,
    pub name: String,
    pub price: String,
    pub description: Option<String>,
    pub selected: bool,
}

/// A payment method radio option.
#[derive(Clone, Debug)]
pub struct PaymentOptionView {
    pub slug: &'static str,
    pub label: &'static str,
    pub selected: bool,
    pub requires_receipt: bool,
}

/// One entry of the step indicator.
#[derive(Clone, Debug)]
pub struct StepView {
    pub number: u8,
    pub label: &'static str,
    /// `done`, `current` or `upcoming`
    pub status: &'static str,
}

/// Everything the review step shows.
#[derive(Clone, Debug, Default)]
pub struct ReviewView {
    pub email: String,
    pub phone: String,
    pub shipping_name: String,
    pub shipping_address: String,
    pub billing_same: bool,
    pub billing_name: String,
    pub billing_address: String,
    pub method: Option<String>,
    pub notes: Option<String>,
}

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub store: StoreView,
    pub nonce: String,
    pub flash: Option<String>,
    pub step: &'static str,
    pub steps: Vec<StepView>,
    pub errors: FieldErrors,
    /// Order placement failure shown above the summary.
    pub general_error: Option<String>,
    // Shipping step
    pub contact_fields: Vec<FieldView>,
    pub shipping: AddressFormView,
    pub billing_same: bool,
    pub billing: AddressFormView,
    pub notes: String,
    pub shipping_methods: Vec<ShippingOptionView>,
    // Review step
    pub review: ReviewView,
    // Payment step
    pub payment_methods: Vec<PaymentOptionView>,
    pub receipt_field: &'static str,
    pub bank_details: Option<String>,
    pub terms_url: Option<String>,
    // Summary panel
    pub cart: CartView,
    pub summary: SummaryView,
}

/// Page that immediately posts the order form to the backend.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/redirect.html")]
pub struct RedirectFormTemplate {
    pub store: StoreView,
    pub nonce: String,
    pub form: HiddenForm,
}

// =============================================================================
// Form Types
// =============================================================================

/// Shipping step form data. Every field is optional on the wire; the core
/// validation decides what is missing.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ShippingForm {
    pub email: String,
    pub phone: String,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub postal_code: String,
    pub country_id: String,
    pub state_id: String,
    pub city_id: String,
    /// Checkbox: present when billing differs from shipping.
    pub billing_different: Option<String>,
    pub billing_first_name: String,
    pub billing_last_name: String,
    pub billing_address: String,
    pub billing_postal_code: String,
    pub billing_country_id: String,
    pub billing_state_id: String,
    pub billing_city_id: String,
    pub shipping_method_id: String,
    pub notes: String,
}

#[derive(Debug, Deserialize)]
pub struct ShippingMethodForm {
    #[serde(default)]
    pub shipping_method_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CouponForm {
    #[serde(default)]
    pub code: String,
}

/// Parse an id from a form value; blank or malformed means unset.
fn parse_id<T: std::str::FromStr>(raw: &str) -> Option<T> {
    raw.trim().parse().ok()
}

/// Raw address inputs from the shipping form.
struct AddressInput<'a> {
    first_name: &'a str,
    last_name: &'a str,
    address: &'a str,
    postal_code: &'a str,
    ids: (Option<CountryId>, Option<StateId>, Option<CityId>),
}

impl ShippingForm {
    fn shipping_input(&self) -> AddressInput<'_> {
        AddressInput {
            first_name: &self.first_name,
            last_name: &self.last_name,
            address: &self.address,
            postal_code: &self.postal_code,
            ids: (
                parse_id(&self.country_id),
                parse_id(&self.state_id),
                parse_id(&self.city_id),
            ),
        }
    }

    fn billing_input(&self) -> AddressInput<'_> {
        AddressInput {
            first_name: &self.billing_first_name,
            last_name: &self.billing_last_name,
            address: &self.billing_address,
            postal_code: &self.billing_postal_code,
            ids: (
                parse_id(&self.billing_country_id),
                parse_id(&self.billing_state_id),
                parse_id(&self.billing_city_id),
            ),
        }
    }
}

/// Build an address from submitted inputs, resolving location names against
/// option lists fetched for the submitted parents. Ids that do not belong to
/// their parent are dropped.
async fn resolve_address(
    state: &AppState,
    countries: &[Country],
    input: AddressInput<'_>,
) -> Address {
    let (country, region, _) = input.ids;
    let lists = location_lists(state, countries, country, region).await;
    let mut location = LocationSelection::default();
    location.apply_submitted(input.ids, &lists);

    Address {
        first_name: input.first_name.trim().to_string(),
        last_name: input.last_name.trim().to_string(),
        address: input.address.trim().to_string(),
        postal_code: input.postal_code.trim().to_string(),
        location,
    }
}

// =============================================================================
// Page Assembly
// =============================================================================

/// A text input whose error key is its name.
fn text_field(
    name: String,
    label: &'static str,
    value: &str,
    kind: &'static str,
    autocomplete: &'static str,
    errors: &FieldErrors,
) -> FieldView {
    FieldView {
        error: errors.get(&name).map(str::to_string),
        name,
        label,
        value: value.to_string(),
        kind,
        autocomplete,
    }
}

fn options<Id: std::fmt::Display + PartialEq + Copy>(
    locations: &[vitrine_core::address::Location<Id>],
    selected: Option<Id>,
) -> Vec<OptionView> {
    locations
        .iter()
        .map(|l| OptionView {
            value: l.id.to_string(),
            label: l.name.clone(),
            selected: Some(l.id) == selected,
        })
        .collect()
}

/// Inputs for one address. `prefix` is `""` for shipping and `"billing_"`
/// for billing; it prefixes both input names and error keys.
fn address_form(
    prefix: &str,
    address: &Address,
    lists: &LocationLists,
    errors: &FieldErrors,
    base_path: &str,
) -> AddressFormView {
    let name = |field: &str| format!("{prefix}{field}");
    let location = &address.location;

    // Child lists only count while their parent is still the selected one.
    let states = if location.country_id.is_some() && lists.states.parent == location.country_id {
        options(&lists.states.options, location.state_id)
    } else {
        Vec::new()
    };
    let cities = if location.state_id.is_some() && lists.cities.parent == location.state_id {
        options(&lists.cities.options, location.city_id)
    } else {
        Vec::new()
    };

    AddressFormView {
        fields: vec![
            text_field(name("first_name"), "First name", &address.first_name, "text", "given-name", errors),
            text_field(name("last_name"), "Last name", &address.last_name, "text", "family-name", errors),
            text_field(name("address"), "Address", &address.address, "text", "street-address", errors),
            text_field(name("postal_code"), "Postal code", &address.postal_code, "text", "postal-code", errors),
        ],
        locations: vec![
            SelectView {
                name: name("country_id"),
                label: "Country",
                placeholder: "Select country",
                options: options(&lists.countries, location.country_id),
                error: errors.get(&name("country")).map(str::to_string),
                cascade_url: Some(format!("{base_path}/locations/states?country_id=")),
                cascade_target: Some(name("state_id")),
                cascade_reset: Some(name("city_id")),
            },
            SelectView {
                name: name("state_id"),
                label: "State",
                placeholder: "Select state",
                options: states,
                error: errors.get(&name("state")).map(str::to_string),
                cascade_url: Some(format!("{base_path}/locations/cities?state_id=")),
                cascade_target: Some(name("city_id")),
                cascade_reset: None,
            },
            SelectView {
                name: name("city_id"),
                label: "City",
                placeholder: "Select city",
                options: cities,
                error: errors.get(&name("city")).map(str::to_string),
                cascade_url: None,
                cascade_target: None,
                cascade_reset: None,
            },
        ],
    }
}

fn steps(current: CheckoutStep) -> Vec<StepView> {
    CheckoutStep::ALL
        .into_iter()
        .map(|step| StepView {
            number: step.number(),
            label: step.label(),
            status: match step.number().cmp(&current.number()) {
                std::cmp::Ordering::Less => "done",
                std::cmp::Ordering::Equal => "current",
                std::cmp::Ordering::Greater => "upcoming",
            },
        })
        .collect()
}

fn shipping_options(
    methods: &[ShippingMethod],
    selected: Option<ShippingMethodId>,
    ctx: &StoreContext,
) -> Vec<ShippingOptionView> {
    let subtotal = ctx.cart.subtotal();
    methods
        .iter()
        .map(|m| {
            let cost = m.cost_for(subtotal);
            ShippingOptionView {
                id: m.id.to_string(),
                name: m.name.clone(),
                price: if cost.is_zero() {
                    "Free".to_string()
                } else {
                    ctx.props.currency.format(cost)
                },
                description: m.description.clone(),
                selected: Some(m.id) == selected,
            }
        })
        .collect()
}

fn review(checkout: &CheckoutState, methods: &[ShippingMethod]) -> ReviewView {
    let details = &checkout.details;
    let billing = checkout.billing_address();
    ReviewView {
        email: details.contact.email.clone(),
        phone: details.contact.phone.clone(),
        shipping_name: details.shipping_address.full_name(),
        shipping_address: details.shipping_address.one_line(),
        billing_same: details.billing_same_as_shipping,
        billing_name: billing.full_name(),
        billing_address: billing.one_line(),
        method: checkout.selected_method(methods).map(|m| m.name.clone()),
        notes: Some(details.notes.trim().to_string()).filter(|n| !n.is_empty()),
    }
}

/// Messages shown on a checkout render.
#[derive(Default)]
struct Messages {
    errors: FieldErrors,
    general_error: Option<String>,
    flash: Option<String>,
}

impl Messages {
    fn errors(errors: FieldErrors) -> Self {
        Self {
            errors,
            ..Self::default()
        }
    }
}

/// Render the checkout page for the current step.
async fn render(
    state: &AppState,
    ctx: StoreContext,
    props: &CheckoutProps,
    checkout: &CheckoutState,
    messages: Messages,
    nonce: String,
) -> CheckoutTemplate {
    let step = checkout.step();
    let details = &checkout.details;

    // Dropdown lists are only needed while the address form is shown.
    let (shipping_lists, billing_lists) = if step == CheckoutStep::Shipping {
        let shipping = &details.shipping_address.location;
        let billing = &details.billing_address.location;
        let shipping_lists =
            location_lists(state, &props.countries, shipping.country_id, shipping.state_id).await;
        let billing_lists = if details.billing_same_as_shipping {
            LocationLists {
                countries: props.countries.clone(),
                ..LocationLists::default()
            }
        } else {
            location_lists(state, &props.countries, billing.country_id, billing.state_id).await
        };
        (shipping_lists, billing_lists)
    } else {
        (LocationLists::default(), LocationLists::default())
    };

    let enabled = props.enabled_payment_methods();
    let method = checkout.selected_method(&props.shipping_methods);
    let summary = checkout.summary(&ctx.cart, &props.shipping_methods, ctx.props.tax_rate);
    let base = ctx.view.base_path.clone();

    CheckoutTemplate {
        step: step.slug(),
        steps: steps(step),
        general_error: messages.general_error,
        contact_fields: vec![
            text_field("email".to_string(), "Email", &details.contact.email, "email", "email", &messages.errors),
            text_field("phone".to_string(), "Phone", &details.contact.phone, "tel", "tel", &messages.errors),
        ],
        shipping: address_form("", &details.shipping_address, &shipping_lists, &messages.errors, &base),
        billing_same: details.billing_same_as_shipping,
        billing: address_form("billing_", &details.billing_address, &billing_lists, &messages.errors, &base),
        notes: details.notes.clone(),
        shipping_methods: shipping_options(
            &props.shipping_methods,
            details.shipping_method_id,
            &ctx,
        ),
        review: review(checkout, &props.shipping_methods),
        payment_methods: enabled
            .iter()
            .map(|m| PaymentOptionView {
                slug: m.slug(),
                label: m.label(),
                selected: checkout.payment_method == Some(m),
                requires_receipt: m.requires_receipt(),
            })
            .collect(),
        receipt_field: RECEIPT_FIELD,
        bank_details: enabled
            .is_enabled(PaymentMethod::BankTransfer)
            .then(|| props.bank_details.clone())
            .flatten(),
        terms_url: props.terms_url.clone(),
        cart: ctx.cart_view(state),
        summary: SummaryView::new(
            &summary,
            method,
            checkout.coupon.code(),
            &ctx.props.currency,
        ),
        errors: messages.errors,
        flash: messages.flash,
        store: ctx.view,
        nonce,
    }
}

/// Page render with the 422 status used for every rejected submission.
async fn render_rejected(
    state: &AppState,
    ctx: StoreContext,
    props: &CheckoutProps,
    checkout: &CheckoutState,
    messages: Messages,
    nonce: String,
) -> Response {
    let page = render(state, ctx, props, checkout, messages, nonce).await;
    (StatusCode::UNPROCESSABLE_ENTITY, page).into_response()
}

// =============================================================================
// Session Helpers
// =============================================================================

/// The saved checkout, or a fresh one prefilled from the buyer's defaults.
async fn load_or_start(
    session: &Session,
    ctx: &StoreContext,
    props: &CheckoutProps,
) -> Result<CheckoutState> {
    if session::has_checkout(session, ctx.slug()).await? {
        return Ok(session::load_checkout(session, ctx.slug()).await?);
    }
    let details = props
        .customer
        .as_ref()
        .map(|c| c.to_details())
        .unwrap_or_default();
    Ok(CheckoutState::with_details(details))
}

fn to_checkout(ctx: &StoreContext) -> Response {
    Redirect::to(&ctx.path("/checkout")).into_response()
}

/// Load everything a checkout POST needs.
async fn begin(
    state: &AppState,
    session: &Session,
    store: &str,
) -> Result<(StoreContext, CheckoutProps, CheckoutState)> {
    let ctx = StoreContext::load(state, session, store).await?;
    let props = state.backend().checkout_props(ctx.slug()).await?;
    let checkout = load_or_start(session, &ctx, &props).await?;
    Ok((ctx, props, checkout))
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the current checkout step.
#[instrument(skip(state, session, nonce))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Path(store): Path<String>,
    CspNonce(nonce): CspNonce,
) -> Result<Response> {
    let ctx = StoreContext::load(&state, &session, &store).await?;
    if ctx.cart.is_empty() {
        session::set_flash(&session, ctx.slug(), "Your cart is empty.").await?;
        return Ok(Redirect::to(&ctx.path("/cart")).into_response());
    }

    let props = state.backend().checkout_props(ctx.slug()).await?;
    let checkout = load_or_start(&session, &ctx, &props).await?;
    let flash = ctx.take_flash(&session).await?;

    let messages = Messages {
        flash,
        ..Messages::default()
    };
    let page = render(&state, ctx, &props, &checkout, messages, nonce).await;
    Ok(page.into_response())
}

/// Submit the shipping step.
#[instrument(skip(state, session, nonce, form))]
pub async fn submit_shipping(
    State(state): State<AppState>,
    session: Session,
    Path(store): Path<String>,
    CspNonce(nonce): CspNonce,
    Form(form): Form<ShippingForm>,
) -> Result<Response> {
    let (ctx, props, mut checkout) = begin(&state, &session, &store).await?;

    let billing_same = form.billing_different.is_none();
    let shipping_address = resolve_address(&state, &props.countries, form.shipping_input()).await;
    let billing_address = if billing_same {
        Address::default()
    } else {
        resolve_address(&state, &props.countries, form.billing_input()).await
    };

    let details = ShippingDetails {
        contact: ContactDetails {
            email: form.email.trim().to_string(),
            phone: form.phone.trim().to_string(),
        },
        shipping_address,
        billing_same_as_shipping: billing_same,
        billing_address,
        shipping_method_id: parse_id(&form.shipping_method_id),
        notes: form.notes,
    };

    match checkout.submit_shipping(details, &props.shipping_methods) {
        Ok(()) => {
            session::save_checkout(&session, ctx.slug(), &checkout).await?;
            add_breadcrumb("checkout", "Shipping step completed", Some(&[("store", ctx.slug())]));
            Ok(to_checkout(&ctx))
        }
        Err(CheckoutError::Invalid(errors)) => {
            tracing::info!(fields = errors.len(), "Shipping step rejected");
            session::save_checkout(&session, ctx.slug(), &checkout).await?;
            Ok(render_rejected(&state, ctx, &props, &checkout, Messages::errors(errors), nonce).await)
        }
        Err(e @ CheckoutError::OutOfOrder { .. }) => {
            tracing::debug!(error = %e, "Ignoring out-of-order step submission");
            Ok(to_checkout(&ctx))
        }
    }
}

/// Change the shipping method from the summary panel.
#[instrument(skip(state, session, nonce))]
pub async fn select_shipping_method(
    State(state): State<AppState>,
    session: Session,
    Path(store): Path<String>,
    CspNonce(nonce): CspNonce,
    Form(form): Form<ShippingMethodForm>,
) -> Result<Response> {
    let (ctx, props, mut checkout) = begin(&state, &session, &store).await?;

    let result = match parse_id(&form.shipping_method_id) {
        Some(id) => checkout.select_shipping_method(id, &props.shipping_methods),
        None => {
            let mut errors = FieldErrors::new();
            errors.insert("shipping_method", "Please choose a shipping method.");
            Err(CheckoutError::Invalid(errors))
        }
    };

    match result {
        Ok(()) => {
            session::save_checkout(&session, ctx.slug(), &checkout).await?;
            Ok(to_checkout(&ctx))
        }
        Err(e) => {
            let errors = e.field_errors().cloned().unwrap_or_default();
            Ok(render_rejected(&state, ctx, &props, &checkout, Messages::errors(errors), nonce).await)
        }
    }
}

/// Confirm the review step.
#[instrument(skip(state, session, nonce))]
pub async fn confirm_review(
    State(state): State<AppState>,
    session: Session,
    Path(store): Path<String>,
    CspNonce(nonce): CspNonce,
) -> Result<Response> {
    let (ctx, props, mut checkout) = begin(&state, &session, &store).await?;

    match checkout.confirm_review(&ctx.cart, &props.shipping_methods) {
        Ok(()) => {
            session::save_checkout(&session, ctx.slug(), &checkout).await?;
            Ok(to_checkout(&ctx))
        }
        Err(CheckoutError::Invalid(errors)) => {
            Ok(render_rejected(&state, ctx, &props, &checkout, Messages::errors(errors), nonce).await)
        }
        Err(CheckoutError::OutOfOrder { .. }) => Ok(to_checkout(&ctx)),
    }
}

/// Go back one step.
#[instrument(skip(state, session))]
pub async fn back(
    State(state): State<AppState>,
    session: Session,
    Path(store): Path<String>,
) -> Result<Response> {
    let (ctx, _props, mut checkout) = begin(&state, &session, &store).await?;
    checkout.back();
    session::save_checkout(&session, ctx.slug(), &checkout).await?;
    Ok(to_checkout(&ctx))
}

/// Validate a coupon against the backend and apply it.
#[instrument(skip(state, session, nonce))]
pub async fn apply_coupon(
    State(state): State<AppState>,
    session: Session,
    Path(store): Path<String>,
    CspNonce(nonce): CspNonce,
    Form(form): Form<CouponForm>,
) -> Result<Response> {
    let (ctx, props, mut checkout) = begin(&state, &session, &store).await?;

    let rejection = match checkout.coupon.prepare(&form.code) {
        Err(e) => Some(sentence(&e.to_string())),
        Ok(code) => {
            let request = CouponRequest {
                store_id: ctx.props.id,
                code: &code,
                shipping_method_id: checkout.details.shipping_method_id,
                subtotal: ctx.cart.subtotal(),
            };
            match state.backend().validate_coupon(&request).await {
                Ok(discount) => checkout
                    .coupon
                    .apply(code, discount)
                    .err()
                    .map(|e| sentence(&e.to_string())),
                Err(BackendError::Rejected(message)) => Some(message),
                Err(e) => {
                    tracing::warn!(error = %e, "Coupon validation failed");
                    Some(COUPON_UNAVAILABLE.to_string())
                }
            }
        }
    };

    if let Some(message) = rejection {
        let mut errors = FieldErrors::new();
        errors.insert("coupon", message);
        return Ok(render_rejected(&state, ctx, &props, &checkout, Messages::errors(errors), nonce).await);
    }

    session::save_checkout(&session, ctx.slug(), &checkout).await?;
    add_breadcrumb("checkout", "Coupon applied", Some(&[("store", ctx.slug())]));
    Ok(to_checkout(&ctx))
}

/// Remove the applied coupon; the discount returns to zero.
#[instrument(skip(state, session))]
pub async fn remove_coupon(
    State(state): State<AppState>,
    session: Session,
    Path(store): Path<String>,
) -> Result<Response> {
    let (ctx, _props, mut checkout) = begin(&state, &session, &store).await?;
    checkout.coupon.remove();
    session::save_checkout(&session, ctx.slug(), &checkout).await?;
    Ok(to_checkout(&ctx))
}

/// Payment step inputs read from the multipart body.
struct PlaceOrderInput {
    payment: PaymentDetails,
    attachment: Option<Attachment>,
}

fn bad_multipart(e: MultipartError) -> AppError {
    AppError::BadRequest(e.body_text())
}

async fn read_place_order(mut multipart: Multipart) -> Result<PlaceOrderInput> {
    let mut payment = PaymentDetails::default();
    let mut attachment = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "payment_method" => {
                payment.method = Some(field.text().await.map_err(bad_multipart)?);
            }
            "terms" => {
                payment.accepted_terms = !field.text().await.map_err(bad_multipart)?.is_empty();
            }
            RECEIPT_FIELD => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(bad_multipart)?;
                // Browsers send an empty part when no file is chosen.
                if !file_name.is_empty() && !bytes.is_empty() {
                    attachment = Some(Attachment {
                        field: RECEIPT_FIELD,
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            _ => {}
        }
    }

    payment.has_receipt = attachment.is_some();
    Ok(PlaceOrderInput {
        payment,
        attachment,
    })
}

/// Place the order with the chosen payment method.
///
/// Exactly one submission strategy runs. Failures re-render the payment
/// step with a single message above the summary; nothing is retried.
#[instrument(skip(state, session, nonce, multipart))]
pub async fn place(
    State(state): State<AppState>,
    session: Session,
    Path(store): Path<String>,
    CspNonce(nonce): CspNonce,
    multipart: Multipart,
) -> Result<Response> {
    let input = read_place_order(multipart).await?;
    let (ctx, props, mut checkout) = begin(&state, &session, &store).await?;

    if ctx.cart.is_empty() {
        session::set_flash(&session, ctx.slug(), "Your cart is empty.").await?;
        return Ok(Redirect::to(&ctx.path("/cart")).into_response());
    }

    let method = match checkout.submit_payment(&input.payment, &props.enabled_payment_methods()) {
        Ok(method) => method,
        Err(CheckoutError::Invalid(errors)) => {
            session::save_checkout(&session, ctx.slug(), &checkout).await?;
            return Ok(render_rejected(&state, ctx, &props, &checkout, Messages::errors(errors), nonce).await);
        }
        Err(CheckoutError::OutOfOrder { .. }) => return Ok(to_checkout(&ctx)),
    };
    session::save_checkout(&session, ctx.slug(), &checkout).await?;

    let summary = checkout.summary(&ctx.cart, &props.shipping_methods, ctx.props.tax_rate);
    let payload =
        vitrine_core::OrderPayload::assemble(ctx.props.id, &ctx.cart, &checkout, method, &summary);

    add_breadcrumb("checkout", "Placing order", Some(&[("method", method.slug())]));
    let order = OrderSubmission {
        store: ctx.slug(),
        payload: &payload,
        csrf_token: &props.csrf_token,
        attachment: input.attachment,
    };

    match payments::dispatch(state.payments(), state.backend(), state.config(), order).await {
        Ok(Submission::Redirect(url)) => Ok(Redirect::to(&url).into_response()),
        Ok(Submission::AutoSubmit(form)) => Ok(RedirectFormTemplate {
            store: ctx.view,
            nonce,
            form,
        }
        .into_response()),
        Err(e) => {
            if e.is_server_error() {
                let event_id = sentry::capture_error(&e);
                tracing::error!(error = %e, sentry_event_id = %event_id, "Order placement failed");
            } else {
                tracing::warn!(error = %e, "Order placement declined");
            }
            let messages = Messages {
                general_error: Some(e.buyer_message()),
                ..Messages::default()
            };
            Ok(render_rejected(&state, ctx, &props, &checkout, messages, nonce).await)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use vitrine_core::ShippingKind;

    use super::*;

    fn lists() -> LocationLists {
        LocationLists {
            countries: vec![Country {
                id: CountryId::new(1),
                name: "Kenya".to_string(),
            }],
            states: vitrine_core::address::ChildOptions::new(
                CountryId::new(1),
                vec![vitrine_core::State {
                    id: StateId::new(7),
                    name: "Nairobi".to_string(),
                }],
            ),
            cities: vitrine_core::address::ChildOptions::default(),
        }
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id::<CountryId>(" 3 "), Some(CountryId::new(3)));
        assert_eq!(parse_id::<CountryId>(""), None);
        assert_eq!(parse_id::<CountryId>("x"), None);
    }

    #[test]
    fn test_address_form_names_and_errors() {
        let mut address = Address::default();
        address.location.country_id = Some(CountryId::new(1));
        address.location.state_id = Some(StateId::new(7));

        let mut errors = FieldErrors::new();
        errors.insert("billing_city", "City is required.");
        errors.insert("billing_first_name", "First name is required.");

        let form = address_form("billing_", &address, &lists(), &errors, "/maison");
        assert_eq!(form.fields[0].name, "billing_first_name");
        assert_eq!(form.fields[0].error.as_deref(), Some("First name is required."));

        let country = &form.locations[0];
        assert_eq!(country.name, "billing_country_id");
        assert!(country.options[0].selected);
        assert_eq!(
            country.cascade_url.as_deref(),
            Some("/maison/locations/states?country_id=")
        );
        assert_eq!(country.cascade_target.as_deref(), Some("billing_state_id"));

        let state = &form.locations[1];
        assert_eq!(state.options.len(), 1);
        assert!(state.options[0].selected);

        let city = &form.locations[2];
        assert!(city.options.is_empty());
        assert_eq!(city.error.as_deref(), Some("City is required."));
    }

    #[test]
    fn test_stale_child_list_is_not_rendered() {
        let mut address = Address::default();
        address.location.country_id = Some(CountryId::new(2));

        let form = address_form("", &address, &lists(), &FieldErrors::new(), "/maison");
        assert!(form.locations[1].options.is_empty());
    }

    #[test]
    fn test_steps() {
        let view = steps(CheckoutStep::Review);
        let statuses: Vec<_> = view.iter().map(|s| s.status).collect();
        assert_eq!(statuses, ["done", "current", "upcoming"]);
    }

    #[test]
    fn test_review_uses_shipping_address_for_billing() {
        let mut details = ShippingDetails::default();
        details.shipping_address.first_name = "Ada".to_string();
        details.shipping_address.last_name = "Lovelace".to_string();
        details.notes = "  ".to_string();
        details.shipping_method_id = Some(ShippingMethodId::new(1));
        let checkout = CheckoutState::with_details(details);

        let methods = [ShippingMethod {
            id: ShippingMethodId::new(1),
            name: "Courier".to_string(),
            kind: ShippingKind::FlatRate,
            cost: Decimal::new(5, 0),
            handling_fee: Decimal::ZERO,
            min_order_amount: None,
            description: None,
        }];

        let view = review(&checkout, &methods);
        assert!(view.billing_same);
        assert_eq!(view.billing_name, "Ada Lovelace");
        assert_eq!(view.method.as_deref(), Some("Courier"));
        assert!(view.notes.is_none());
    }
}
