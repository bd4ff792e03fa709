//! Cart persistence for guests and logged-in customers.
//!
//! Guests keep their cart in the session under `guest_cart`. Logged-in
//! customers keep one `cart` item per product in the item store, with the
//! deterministic id `cart-{userId}-{productId}`. All writes are
//! last-write-wins.

use thiserror::Error;
use tower_sessions::Session;
use tracing::instrument;

use atelier_core::cart::{Cart, CartLine, reconcile};
use atelier_core::store::{ItemStoreClient, StoreError};
use atelier_core::{CartEntry, ItemId, ProductId, UserId};

use crate::models::{CurrentUser, session_keys};

/// Errors that can occur while reading or writing a cart.
#[derive(Debug, Error)]
pub enum CartError {
    /// Item store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Session store error.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

/// Cart operations for one request.
pub struct CartService<'a> {
    store: &'a ItemStoreClient,
    session: &'a Session,
    user: Option<&'a CurrentUser>,
}

impl<'a> CartService<'a> {
    /// Cart of the visitor behind `session`, logged in as `user` if given.
    #[must_use]
    pub const fn new(
        store: &'a ItemStoreClient,
        session: &'a Session,
        user: Option<&'a CurrentUser>,
    ) -> Self {
        Self {
            store,
            session,
            user,
        }
    }

    /// Load the current cart.
    ///
    /// # Errors
    ///
    /// Returns error if the session or item store cannot be read.
    pub async fn load(&self) -> Result<Cart, CartError> {
        match self.user {
            Some(user) => self.load_server(&user.id).await,
            None => self.load_guest().await,
        }
    }

    async fn load_guest(&self) -> Result<Cart, CartError> {
        Ok(self
            .session
            .get::<Cart>(session_keys::GUEST_CART)
            .await?
            .unwrap_or_default())
    }

    async fn save_guest(&self, cart: &Cart) -> Result<(), CartError> {
        self.session.insert(session_keys::GUEST_CART, cart).await?;
        Ok(())
    }

    async fn load_server(&self, user_id: &UserId) -> Result<Cart, CartError> {
        let entries = self
            .store
            .find_records::<CartEntry>("userId", user_id.as_str())
            .await?;
        Ok(Cart::from_entries(
            entries.into_iter().filter(|e| &e.user_id == user_id),
        ))
    }

    /// Add a line, merging with an existing line for the same product.
    ///
    /// Returns the product's resulting quantity.
    ///
    /// # Errors
    ///
    /// Returns error if the cart cannot be read or written.
    #[instrument(skip(self, line), fields(product_id = %line.product_id))]
    pub async fn add(&self, line: CartLine) -> Result<u32, CartError> {
        let mut cart = self.load().await?;
        let product_id = line.product_id.clone();
        let quantity = cart.add(line);

        match self.user {
            Some(user) => {
                if let Some(line) = cart.line(&product_id) {
                    self.store.save_record(line.to_entry(&user.id)).await?;
                }
            }
            None => self.save_guest(&cart).await?,
        }
        Ok(quantity)
    }

    /// Overwrite a product's quantity; zero removes the line.
    ///
    /// Returns `false` when the product is not in the cart.
    ///
    /// # Errors
    ///
    /// Returns error if the cart cannot be read or written.
    #[instrument(skip(self))]
    pub async fn set_quantity(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<bool, CartError> {
        let mut cart = self.load().await?;
        if !cart.set_quantity(product_id, quantity) {
            return Ok(false);
        }

        match self.user {
            Some(user) => match cart.line(product_id) {
                Some(line) => {
                    self.store.save_record(line.to_entry(&user.id)).await?;
                }
                None => {
                    self.store
                        .delete_item(&ItemId::cart_line(&user.id, product_id))
                        .await?;
                }
            },
            None => self.save_guest(&cart).await?,
        }
        Ok(true)
    }

    /// Remove a product from the cart.
    ///
    /// # Errors
    ///
    /// Returns error if the cart cannot be read or written.
    #[instrument(skip(self))]
    pub async fn remove(&self, product_id: &ProductId) -> Result<(), CartError> {
        match self.user {
            Some(user) => {
                self.store
                    .delete_item(&ItemId::cart_line(&user.id, product_id))
                    .await?;
            }
            None => {
                let mut cart = self.load_guest().await?;
                if cart.remove(product_id).is_some() {
                    self.save_guest(&cart).await?;
                }
            }
        }
        Ok(())
    }

    /// Empty the cart: the session cart always, the server lines when
    /// logged in.
    ///
    /// # Errors
    ///
    /// Returns error if the cart cannot be read or written.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<(), CartError> {
        self.session.remove::<Cart>(session_keys::GUEST_CART).await?;

        if let Some(user) = self.user {
            let cart = self.load_server(&user.id).await?;
            for line in cart.lines() {
                self.store
                    .delete_item(&ItemId::cart_line(&user.id, &line.product_id))
                    .await?;
            }
        }
        Ok(())
    }

    /// Fold the session's guest cart into `user`'s server cart after login.
    ///
    /// Guest quantities win for products on both sides; only lines that
    /// changed are written. The guest cart is cleared afterwards.
    ///
    /// # Errors
    ///
    /// Returns error if the cart cannot be read or written.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn merge_guest_into(&self, user: &CurrentUser) -> Result<Cart, CartError> {
        let guest = self.load_guest().await?;
        let server = self.load_server(&user.id).await?;
        if guest.is_empty() {
            return Ok(server);
        }

        let merged = reconcile(&guest, &server);
        for line in &merged.changed {
            self.store.save_record(line.to_entry(&user.id)).await?;
        }
        self.session.remove::<Cart>(session_keys::GUEST_CART).await?;

        tracing::info!(lines = merged.changed.len(), "Guest cart merged");
        Ok(merged.cart)
    }
}
