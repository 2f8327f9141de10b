//! Customer account operations.
//!
//! Authentication itself is the upstream's business (credential checks run
//! there); this service keeps the session's customer snapshot in step. A
//! populated snapshot is what "signed in" means to the rest of the crate.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{instrument, warn};

use reef_core::Email;

use crate::api::ProxyApi;
use crate::error::ClientError;
use crate::stores::CustomerStore;
use crate::types::Customer;

/// Form fields requested with every customer payload.
const CUSTOMER_INCLUDE: &str = "formfields";

/// Registration data for a new customer account.
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

/// Customer operations over the session store.
pub struct CustomerService {
    api: Arc<ProxyApi>,
    store: Arc<CustomerStore>,
}

impl CustomerService {
    /// Create a customer service.
    #[must_use]
    pub fn new(api: Arc<ProxyApi>, store: Arc<CustomerStore>) -> Self {
        Self { api, store }
    }

    /// Whether the session has a signed-in customer.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.store.snapshot().is_some()
    }

    /// Load the session's customer from the upstream.
    ///
    /// An empty result clears the snapshot: the session is a guest.
    #[instrument(skip(self))]
    pub async fn load(&self) {
        self.store.set_errors(|errors| errors.load = None);

        match self
            .api
            .call_data::<Vec<Customer>>(
                "getCustomers",
                &[json!({ "include": CUSTOMER_INCLUDE })],
            )
            .await
        {
            Ok(customers) => match customers.into_iter().next() {
                Some(customer) => self.store.replace(customer),
                None => self.store.clear(),
            },
            Err(err) => {
                warn!(error = %err, "customer load failed");
                self.store.set_errors(|errors| errors.load = Some(err));
            }
        }
    }

    /// Register a new customer account and sign the session in.
    #[instrument(skip(self, customer), fields(email = %customer.email))]
    pub async fn register(&self, customer: &NewCustomer) {
        self.store.set_errors(|errors| errors.register = None);

        let result: Result<(), ClientError> = async {
            let created: Vec<Customer> = self
                .api
                .call_data(
                    "createCustomer",
                    &[json!({
                        "email": customer.email.as_str(),
                        "first_name": customer.first_name,
                        "last_name": customer.last_name,
                        "authentication": {
                            "force_password_reset": false,
                            "new_password": customer.password
                        }
                    })],
                )
                .await?;

            match created.into_iter().next() {
                Some(customer) => {
                    self.store.replace(customer);
                    Ok(())
                }
                None => Err(ClientError::Precondition(
                    "registration returned no customer",
                )),
            }
        }
        .await;

        if let Err(err) = result {
            warn!(error = %err, "customer registration failed");
            self.store.set_errors(|errors| errors.register = Some(err));
        }
    }

    /// Validate credentials upstream and load the customer on success.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &Email, password: &str) {
        self.store.set_errors(|errors| errors.login = None);

        let result = self
            .api
            .call(
                "loginCustomer",
                &[json!({ "email": email.as_str(), "password": password })],
            )
            .await;

        match result {
            Ok(_) => self.load().await,
            Err(err) => {
                warn!(error = %err, "customer login failed");
                self.store.set_errors(|errors| errors.login = Some(err));
            }
        }
    }

    /// Sign the session out.
    ///
    /// Purely local: the snapshot is dropped; cookie teardown is the
    /// embedding application's concern.
    pub fn logout(&self) {
        self.store.clear();
    }

    /// Update the customer's profile and replace the snapshot.
    #[instrument(skip(self, fields))]
    pub async fn update_customer(&self, fields: Value) {
        self.store.set_errors(|errors| errors.update_customer = None);

        let result: Result<(), ClientError> = async {
            let current = self
                .store
                .snapshot()
                .ok_or(ClientError::Precondition("no signed-in customer to update"))?;

            let mut payload = fields;
            match payload.as_object_mut() {
                Some(object) => {
                    object.insert("id".to_string(), json!(current.id));
                }
                None => {
                    return Err(ClientError::Precondition(
                        "customer update fields must be an object",
                    ));
                }
            }

            let updated: Vec<Customer> = self
                .api
                .call_data("updateCustomer", &[payload])
                .await?;

            match updated.into_iter().next() {
                Some(customer) => {
                    self.store.replace(customer);
                    Ok(())
                }
                None => Err(ClientError::Precondition("update returned no customer")),
            }
        }
        .await;

        if let Err(err) = result {
            warn!(error = %err, "customer update failed");
            self.store
                .set_errors(|errors| errors.update_customer = Some(err));
        }
    }

    /// Write custom form field values, then reload the snapshot wholesale.
    #[instrument(skip(self, fields))]
    pub async fn update_form_fields(&self, fields: Vec<Value>) {
        self.store
            .set_errors(|errors| errors.update_form_fields = None);

        let result = self
            .api
            .call("updateCustomerFormFields", &[json!({ "data": fields })])
            .await;

        match result {
            // The store never patches a snapshot in place; re-fetch instead
            Ok(_) => self.load().await,
            Err(err) => {
                warn!(error = %err, "customer form field update failed");
                self.store
                    .set_errors(|errors| errors.update_form_fields = Some(err));
            }
        }
    }
}
