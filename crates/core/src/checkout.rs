//! Four-stage checkout flow.
//!
//! `Cart(1) → Address(2) → Payment(3) → Confirmation(4)`. Moving forward
//! validates the current stage; `back()` steps back one stage. Leaving the
//! cart requires a signed-in session, and reaching confirmation requires the
//! order gateway to accept the order.
//!
//! The engine is I/O free except for the [`OrderGateway`] port, which the
//! HTTP client implements.

use std::future::Future;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cart::Cart;
use crate::order::{CreateOrderRequest, Order, OrderAddress};
use crate::types::PaymentMethod;

/// Country stamped on every checkout address.
pub const DEFAULT_COUNTRY: &str = "India";

const PHONE_DIGITS: usize = 10;
const PINCODE_DIGITS: usize = 6;
const CARD_DIGITS: usize = 16;
const EXPIRY_DIGITS: usize = 4;
const CVV_DIGITS: usize = 3;

/// Checkout stage, numbered as shown to the shopper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStage {
    Cart = 1,
    Address = 2,
    Payment = 3,
    Confirmation = 4,
}

impl CheckoutStage {
    #[must_use]
    pub const fn number(self) -> u8 {
        self as u8
    }
}

/// Why a checkout step could not be taken.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckoutError {
    #[error("please sign in to continue")]
    AuthRequired,
    #[error("your cart is empty")]
    EmptyCart,
    #[error("{field} is required")]
    IncompleteAddress { field: &'static str },
    #[error("phone number must be 10 digits")]
    InvalidPhone,
    #[error("please select a payment method")]
    NoPaymentMethodSelected,
    #[error("please fill in all card details")]
    IncompleteCardDetails,
    #[error("please enter your UPI ID")]
    MissingUpiId,
    #[error("cannot continue from the {0:?} stage")]
    InvalidTransition(CheckoutStage),
    #[error("{0}")]
    SubmitFailed(String),
}

/// Non-blocking notice attached to the address form after a pincode lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PincodeWarning {
    /// The lookup found no post office for the pincode.
    InvalidPincode,
    /// The lookup service could not be reached.
    LookupFailed,
}

/// City and state resolved from a pincode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostalArea {
    pub city: String,
    pub state: String,
}

/// Outcome of a pincode lookup as reported by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PincodeLookup {
    Found(PostalArea),
    NotFound,
    Failed,
}

/// Delivery address as typed by the shopper.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddressForm {
    pub full_name: String,
    pub phone: String,
    pub house_no: String,
    pub street: String,
    pub pincode: String,
    pub city: String,
    pub state: String,
    #[serde(skip)]
    pub pincode_warning: Option<PincodeWarning>,
}

impl AddressForm {
    /// Store the phone number, keeping at most 10 digits.
    pub fn set_phone(&mut self, raw: &str) {
        self.phone = digits(raw, PHONE_DIGITS);
    }

    /// Store the pincode, keeping at most 6 digits.
    ///
    /// Returns `true` when the pincode is complete and should be looked up.
    /// An incomplete pincode clears city, state and any previous warning.
    pub fn set_pincode(&mut self, raw: &str) -> bool {
        self.pincode = digits(raw, PINCODE_DIGITS);
        if self.pincode.len() == PINCODE_DIGITS {
            true
        } else {
            self.city.clear();
            self.state.clear();
            self.pincode_warning = None;
            false
        }
    }

    /// Apply a lookup result: a hit fills city and state, anything else
    /// clears them and records a warning.
    pub fn apply_pincode_lookup(&mut self, lookup: PincodeLookup) {
        match lookup {
            PincodeLookup::Found(area) => {
                self.city = area.city;
                self.state = area.state;
                self.pincode_warning = None;
            }
            PincodeLookup::NotFound => {
                self.city.clear();
                self.state.clear();
                self.pincode_warning = Some(PincodeWarning::InvalidPincode);
            }
            PincodeLookup::Failed => {
                self.city.clear();
                self.state.clear();
                self.pincode_warning = Some(PincodeWarning::LookupFailed);
            }
        }
    }
}

/// Check the address form and convert it to the order address.
///
/// Required fields are checked in form order and the first blank one is
/// named in the error; the 10-digit phone rule is checked after that.
///
/// # Errors
///
/// [`CheckoutError::IncompleteAddress`] or [`CheckoutError::InvalidPhone`].
pub fn validate_address(form: &AddressForm, email: &str) -> Result<OrderAddress, CheckoutError> {
    let required = [
        ("fullName", &form.full_name),
        ("phone", &form.phone),
        ("houseNo", &form.house_no),
        ("street", &form.street),
        ("pincode", &form.pincode),
        ("city", &form.city),
        ("state", &form.state),
    ];
    if let Some(&(field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
        return Err(CheckoutError::IncompleteAddress { field });
    }

    let phone = form.phone.trim();
    if phone.len() != PHONE_DIGITS || !phone.chars().all(|c| c.is_ascii_digit()) {
        return Err(CheckoutError::InvalidPhone);
    }

    let full_name = form.full_name.trim();
    let (first_name, last_name) = match full_name.split_once(char::is_whitespace) {
        Some((first, rest)) if !rest.trim().is_empty() => (first, rest.trim()),
        _ => (full_name, "."),
    };

    Ok(OrderAddress {
        first_name: first_name.to_owned(),
        last_name: last_name.to_owned(),
        email: email.trim().to_owned(),
        street: format!("{}, {}", form.house_no.trim(), form.street.trim()),
        city: form.city.trim().to_owned(),
        state: form.state.trim().to_owned(),
        zipcode: form.pincode.trim().to_owned(),
        country: DEFAULT_COUNTRY.to_owned(),
        phone: phone.to_owned(),
    })
}

/// Card fields as typed by the shopper.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CardDetails {
    pub number: String,
    pub expiry: String,
    pub cvv: String,
    pub holder_name: String,
}

impl CardDetails {
    pub fn set_number(&mut self, raw: &str) {
        self.number = format_card_number(raw);
    }

    pub fn set_expiry(&mut self, raw: &str) {
        self.expiry = format_expiry(raw);
    }

    pub fn set_cvv(&mut self, raw: &str) {
        self.cvv = normalize_cvv(raw);
    }
}

/// Payment step input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentDetails {
    pub method: Option<PaymentMethod>,
    pub card: CardDetails,
    pub upi_id: String,
}

/// Check the payment step and return the chosen method.
///
/// # Errors
///
/// [`CheckoutError::NoPaymentMethodSelected`],
/// [`CheckoutError::IncompleteCardDetails`] or [`CheckoutError::MissingUpiId`].
pub fn validate_payment(details: &PaymentDetails) -> Result<PaymentMethod, CheckoutError> {
    let method = details
        .method
        .ok_or(CheckoutError::NoPaymentMethodSelected)?;
    match method {
        PaymentMethod::Card => {
            let card = &details.card;
            if [&card.number, &card.expiry, &card.cvv, &card.holder_name]
                .iter()
                .any(|v| v.trim().is_empty())
            {
                return Err(CheckoutError::IncompleteCardDetails);
            }
        }
        PaymentMethod::Upi => {
            if details.upi_id.trim().is_empty() {
                return Err(CheckoutError::MissingUpiId);
            }
        }
        PaymentMethod::Cod => {}
    }
    Ok(method)
}

/// Digits only, at most 16, grouped in blocks of four.
///
/// ```
/// use storehouse_core::checkout::format_card_number;
///
/// assert_eq!(format_card_number("4111-1111 11111111"), "4111 1111 1111 1111");
/// ```
#[must_use]
pub fn format_card_number(raw: &str) -> String {
    let digits = digits(raw, CARD_DIGITS);
    let mut out = String::with_capacity(CARD_DIGITS + 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && i % 4 == 0 {
            out.push(' ');
        }
        out.push(c);
    }
    out
}

/// Digits only, at most four, rendered `MM/YY` once two digits are present.
#[must_use]
pub fn format_expiry(raw: &str) -> String {
    let digits = digits(raw, EXPIRY_DIGITS);
    if digits.len() >= 2 {
        format!("{}/{}", &digits[..2], &digits[2..])
    } else {
        digits
    }
}

/// Digits only, at most three.
#[must_use]
pub fn normalize_cvv(raw: &str) -> String {
    digits(raw, CVV_DIGITS)
}

fn digits(raw: &str, max: usize) -> String {
    raw.chars().filter(char::is_ascii_digit).take(max).collect()
}

/// Failure reported by an [`OrderGateway`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The session credential was missing, invalid or expired.
    #[error("session expired, please sign in again")]
    Unauthorized,
    /// The server refused the order.
    #[error("{0}")]
    Rejected(String),
    /// The server could not be reached.
    #[error("could not reach the store: {0}")]
    Transport(String),
}

/// Port through which checkout submits an order.
pub trait OrderGateway {
    /// Create the order on the server.
    fn submit(
        &self,
        request: CreateOrderRequest,
    ) -> impl Future<Output = Result<Order, GatewayError>> + Send;
}

/// Checkout state for one shopper.
#[derive(Debug, Clone)]
pub struct Checkout {
    stage: CheckoutStage,
    cart: Cart,
    signed_in: bool,
    account_email: String,
    pub address: AddressForm,
    pub payment: PaymentDetails,
    validated_address: Option<OrderAddress>,
    idempotency_key: String,
    last_error: Option<String>,
    placed: Option<Order>,
}

impl Checkout {
    /// Start at the cart stage.
    #[must_use]
    pub fn new(cart: Cart) -> Self {
        Self {
            stage: CheckoutStage::Cart,
            cart,
            signed_in: false,
            account_email: String::new(),
            address: AddressForm::default(),
            payment: PaymentDetails::default(),
            validated_address: None,
            idempotency_key: Uuid::new_v4().to_string(),
            last_error: None,
            placed: None,
        }
    }

    /// Mark the session as signed in for the given account email.
    pub fn sign_in(&mut self, email: impl Into<String>) {
        self.signed_in = true;
        self.account_email = email.into();
    }

    pub fn sign_out(&mut self) {
        self.signed_in = false;
    }

    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        self.signed_in
    }

    #[must_use]
    pub const fn stage(&self) -> CheckoutStage {
        self.stage
    }

    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Mutable access for cart edits while still on the cart stage.
    pub fn cart_mut(&mut self) -> &mut Cart {
        &mut self.cart
    }

    /// Message from the last failed submission, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// The order created by a successful submission.
    #[must_use]
    pub const fn placed_order(&self) -> Option<&Order> {
        self.placed.as_ref()
    }

    /// Key sent with every submission attempt so a retried submit cannot
    /// create a second order.
    ///
    /// A random key is generated when the checkout starts and after each
    /// placed order; this replaces it.
    pub fn set_idempotency_key(&mut self, key: impl Into<String>) {
        self.idempotency_key = key.into();
    }

    /// Key the next submission will carry.
    #[must_use]
    pub fn idempotency_key(&self) -> &str {
        &self.idempotency_key
    }

    /// Net amount that will be charged.
    #[must_use]
    pub fn amount_due(&self) -> Decimal {
        self.cart.totals().net_total
    }

    /// Validate the current stage and move to the next one.
    ///
    /// Submission from the payment stage goes through [`Checkout::submit`].
    ///
    /// # Errors
    ///
    /// The validation failure of the current stage, or
    /// [`CheckoutError::InvalidTransition`] from payment and confirmation.
    pub fn proceed(&mut self) -> Result<CheckoutStage, CheckoutError> {
        match self.stage {
            CheckoutStage::Cart => {
                if self.cart.is_empty() {
                    return Err(CheckoutError::EmptyCart);
                }
                if !self.signed_in {
                    return Err(CheckoutError::AuthRequired);
                }
                self.stage = CheckoutStage::Address;
            }
            CheckoutStage::Address => {
                let address = validate_address(&self.address, &self.account_email)?;
                self.validated_address = Some(address);
                self.stage = CheckoutStage::Payment;
            }
            stage @ (CheckoutStage::Payment | CheckoutStage::Confirmation) => {
                return Err(CheckoutError::InvalidTransition(stage));
            }
        }
        Ok(self.stage)
    }

    /// Step back one stage from address or payment.
    pub fn back(&mut self) -> CheckoutStage {
        self.stage = match self.stage {
            CheckoutStage::Address => CheckoutStage::Cart,
            CheckoutStage::Payment => CheckoutStage::Address,
            other => other,
        };
        self.stage
    }

    /// Build the order-creation request from the current state.
    ///
    /// # Errors
    ///
    /// Any address or payment validation failure, or
    /// [`CheckoutError::EmptyCart`].
    pub fn order_request(&self) -> Result<CreateOrderRequest, CheckoutError> {
        if self.cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let address = match &self.validated_address {
            Some(address) => address.clone(),
            None => validate_address(&self.address, &self.account_email)?,
        };
        let payment_method = validate_payment(&self.payment)?;
        Ok(CreateOrderRequest {
            items: self.cart.order_items(),
            address: Some(address),
            payment_method,
            amount: Some(self.amount_due()),
            idempotency_key: Some(self.idempotency_key.clone()),
        })
    }

    /// Submit the order from the payment stage.
    ///
    /// On success the cart is cleared and the flow moves to confirmation. On
    /// failure the flow stays on payment with the cart intact; an
    /// unauthorized response also ends the session.
    ///
    /// # Errors
    ///
    /// Validation failures, [`CheckoutError::AuthRequired`] after an
    /// unauthorized response, or [`CheckoutError::SubmitFailed`].
    pub async fn submit<G: OrderGateway>(&mut self, gateway: &G) -> Result<&Order, CheckoutError> {
        if self.stage != CheckoutStage::Payment {
            return Err(CheckoutError::InvalidTransition(self.stage));
        }
        if !self.signed_in {
            return Err(CheckoutError::AuthRequired);
        }
        let request = self.order_request()?;

        match gateway.submit(request).await {
            Ok(order) => {
                self.cart.clear();
                self.last_error = None;
                self.idempotency_key = Uuid::new_v4().to_string();
                self.stage = CheckoutStage::Confirmation;
                Ok(self.placed.insert(order))
            }
            Err(GatewayError::Unauthorized) => {
                self.signed_in = false;
                self.last_error = Some(GatewayError::Unauthorized.to_string());
                Err(CheckoutError::AuthRequired)
            }
            Err(e) => {
                let message = e.to_string();
                self.last_error = Some(message.clone());
                Err(CheckoutError::SubmitFailed(message))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use chrono::Utc;

    use super::*;
    use crate::product::ProductSnapshot;
    use crate::types::{OrderId, OrderStatus, PaymentStatus, ProductId, UserId};

    struct FakeGateway {
        outcome: Result<(), GatewayError>,
        seen: Mutex<Vec<CreateOrderRequest>>,
    }

    impl FakeGateway {
        fn new(outcome: Result<(), GatewayError>) -> Self {
            Self {
                outcome,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl OrderGateway for FakeGateway {
        async fn submit(&self, request: CreateOrderRequest) -> Result<Order, GatewayError> {
            self.seen.lock().unwrap().push(request.clone());
            self.outcome.clone()?;
            let now = Utc::now();
            Ok(Order {
                id: OrderId::new(1),
                user_id: UserId::new(1),
                items: Vec::new(),
                amount: request.amount.unwrap_or_default(),
                address: request.address.unwrap_or_default(),
                payment_method: request.payment_method,
                payment_status: PaymentStatus::Pending,
                status: OrderStatus::Pending,
                date: now,
                updated_at: now,
            })
        }
    }

    fn filled_form() -> AddressForm {
        AddressForm {
            full_name: "Asha Rani Verma".to_owned(),
            phone: "9876543210".to_owned(),
            house_no: "12B".to_owned(),
            street: "MG Road".to_owned(),
            pincode: "560001".to_owned(),
            city: "Bengaluru".to_owned(),
            state: "Karnataka".to_owned(),
            pincode_warning: None,
        }
    }

    fn ready_checkout() -> Checkout {
        let mut cart = Cart::new();
        cart.add(
            ProductSnapshot {
                id: ProductId::new(5),
                name: "Kettle".to_owned(),
                price: Decimal::from(1000),
                discounted_percentage: Decimal::from(10),
                image: None,
            },
            2,
        );
        let mut checkout = Checkout::new(cart);
        checkout.sign_in("asha@example.com");
        checkout.address = filled_form();
        checkout.payment.method = Some(PaymentMethod::Cod);
        checkout.proceed().unwrap();
        checkout.proceed().unwrap();
        checkout
    }

    #[test]
    fn test_short_phone_is_invalid() {
        let mut form = filled_form();
        form.phone = "12345".to_owned();
        assert_eq!(
            validate_address(&form, "a@b.in"),
            Err(CheckoutError::InvalidPhone)
        );
    }

    #[test]
    fn test_each_missing_field_is_named() {
        let fields = [
            "fullName", "phone", "houseNo", "street", "pincode", "city", "state",
        ];
        for field in fields {
            let mut form = filled_form();
            match field {
                "fullName" => form.full_name.clear(),
                "phone" => form.phone.clear(),
                "houseNo" => form.house_no.clear(),
                "street" => form.street = "  ".to_owned(),
                "pincode" => form.pincode.clear(),
                "city" => form.city.clear(),
                _ => form.state.clear(),
            }
            assert_eq!(
                validate_address(&form, "a@b.in"),
                Err(CheckoutError::IncompleteAddress { field })
            );
        }
    }

    #[test]
    fn test_address_conversion() {
        let address = validate_address(&filled_form(), "asha@example.com").unwrap();
        assert_eq!(address.first_name, "Asha");
        assert_eq!(address.last_name, "Rani Verma");
        assert_eq!(address.street, "12B, MG Road");
        assert_eq!(address.zipcode, "560001");
        assert_eq!(address.country, "India");
        assert!(address.missing_fields().is_empty());

        let mut single = filled_form();
        single.full_name = "Asha".to_owned();
        let address = validate_address(&single, "asha@example.com").unwrap();
        assert_eq!(address.last_name, ".");
    }

    #[test]
    fn test_pincode_lookup_miss_blocks_on_city() {
        let mut form = filled_form();
        assert!(form.set_pincode("999-999"));
        form.apply_pincode_lookup(PincodeLookup::NotFound);
        assert_eq!(form.pincode_warning, Some(PincodeWarning::InvalidPincode));
        assert_eq!(
            validate_address(&form, "a@b.in"),
            Err(CheckoutError::IncompleteAddress { field: "city" })
        );

        form.apply_pincode_lookup(PincodeLookup::Found(PostalArea {
            city: "Pune".to_owned(),
            state: "Maharashtra".to_owned(),
        }));
        assert_eq!(form.pincode_warning, None);
        assert!(validate_address(&form, "a@b.in").is_ok());

        assert!(!form.set_pincode("4110"));
        assert!(form.city.is_empty());
    }

    #[test]
    fn test_input_normalizers() {
        let mut form = AddressForm::default();
        form.set_phone("+91 98765-43210 99");
        assert_eq!(form.phone, "9198765432");

        assert_eq!(format_card_number("4111111111111111999"), "4111 1111 1111 1111");
        assert_eq!(format_card_number("41111"), "4111 1");
        assert_eq!(format_expiry("1"), "1");
        assert_eq!(format_expiry("12"), "12/");
        assert_eq!(format_expiry("12/275"), "12/27");
        assert_eq!(normalize_cvv("12a34"), "123");
    }

    #[test]
    fn test_payment_validation() {
        let mut details = PaymentDetails::default();
        assert_eq!(
            validate_payment(&details),
            Err(CheckoutError::NoPaymentMethodSelected)
        );

        details.method = Some(PaymentMethod::Card);
        details.card.set_number("4111111111111111");
        details.card.set_expiry("1227");
        assert_eq!(
            validate_payment(&details),
            Err(CheckoutError::IncompleteCardDetails)
        );
        details.card.set_cvv("123");
        details.card.holder_name = "Asha Verma".to_owned();
        assert_eq!(validate_payment(&details), Ok(PaymentMethod::Card));

        details.method = Some(PaymentMethod::Upi);
        assert_eq!(validate_payment(&details), Err(CheckoutError::MissingUpiId));
        details.upi_id = "asha@upi".to_owned();
        assert_eq!(validate_payment(&details), Ok(PaymentMethod::Upi));

        let cod = PaymentDetails {
            method: Some(PaymentMethod::Cod),
            ..PaymentDetails::default()
        };
        assert_eq!(validate_payment(&cod), Ok(PaymentMethod::Cod));
    }

    #[test]
    fn test_leaving_cart_requires_session_and_items() {
        let mut checkout = Checkout::new(Cart::new());
        assert_eq!(checkout.proceed(), Err(CheckoutError::EmptyCart));

        checkout.cart_mut().add(
            ProductSnapshot {
                id: ProductId::new(1),
                name: "Mug".to_owned(),
                price: Decimal::from(300),
                discounted_percentage: Decimal::ZERO,
                image: None,
            },
            1,
        );
        assert_eq!(checkout.proceed(), Err(CheckoutError::AuthRequired));
        assert_eq!(checkout.stage(), CheckoutStage::Cart);

        checkout.sign_in("shopper@example.com");
        assert_eq!(checkout.proceed(), Ok(CheckoutStage::Address));
        assert_eq!(checkout.back(), CheckoutStage::Cart);
    }

    #[tokio::test]
    async fn test_successful_submit_clears_cart() {
        let mut checkout = ready_checkout();
        checkout.set_idempotency_key("retry-1");
        let gateway = FakeGateway::new(Ok(()));

        let order = checkout.submit(&gateway).await.unwrap();
        assert_eq!(order.amount, Decimal::from(1800));
        assert_eq!(checkout.stage(), CheckoutStage::Confirmation);
        assert!(checkout.cart().is_empty());

        let seen = gateway.seen.lock().unwrap();
        assert_eq!(seen[0].idempotency_key.as_deref(), Some("retry-1"));
        assert_eq!(seen[0].amount, Some(Decimal::from(1800)));
    }

    #[tokio::test]
    async fn test_retried_submit_reuses_generated_key() {
        let mut checkout = ready_checkout();
        let key = checkout.idempotency_key().to_owned();
        assert!(!key.is_empty());

        let failing = FakeGateway::new(Err(GatewayError::Rejected("timed out".to_owned())));
        assert!(checkout.submit(&failing).await.is_err());
        assert_eq!(checkout.idempotency_key(), key);

        let gateway = FakeGateway::new(Ok(()));
        checkout.submit(&gateway).await.unwrap();

        let first = failing.seen.lock().unwrap();
        let second = gateway.seen.lock().unwrap();
        assert_eq!(first[0].idempotency_key.as_deref(), Some(key.as_str()));
        assert_eq!(second[0].idempotency_key.as_deref(), Some(key.as_str()));

        // The next order from this checkout gets a fresh key.
        assert_ne!(checkout.idempotency_key(), key);
        assert_ne!(
            Checkout::new(Cart::new()).idempotency_key(),
            Checkout::new(Cart::new()).idempotency_key()
        );
    }

    #[tokio::test]
    async fn test_unauthorized_submit_keeps_cart() {
        let mut checkout = ready_checkout();
        let gateway = FakeGateway::new(Err(GatewayError::Unauthorized));

        let err = checkout.submit(&gateway).await.unwrap_err();
        assert_eq!(err, CheckoutError::AuthRequired);
        assert_eq!(checkout.stage(), CheckoutStage::Payment);
        assert!(!checkout.is_signed_in());
        assert_eq!(checkout.cart().item_count(), 2);
    }

    #[tokio::test]
    async fn test_rejected_submit_surfaces_message() {
        let mut checkout = ready_checkout();
        let gateway = FakeGateway::new(Err(GatewayError::Rejected("Out of stock".to_owned())));

        let err = checkout.submit(&gateway).await.unwrap_err();
        assert_eq!(err, CheckoutError::SubmitFailed("Out of stock".to_owned()));
        assert_eq!(checkout.last_error(), Some("Out of stock"));
        assert_eq!(checkout.stage(), CheckoutStage::Payment);
        assert!(!checkout.cart().is_empty());
    }
}
