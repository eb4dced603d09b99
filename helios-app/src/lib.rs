//! Application bootstrap for the Helios photograph catalog.
//!
//! Provides `AppState` (catalog, modal stack and resource client),
//! `AppStateBuilder` (client and container injection) and the catalog's
//! record kinds and views.
//!
//! Everything built here lives on one thread. Remote work started from
//! button actions is spawned with [`tokio::task::spawn_local`], so the
//! application must run inside a [`tokio::task::LocalSet`].

mod catalog;
mod config;
mod error;
pub mod kinds;
pub mod views;

use std::sync::Arc;

use helios_core::dom::Element;
use helios_core::modal::{ConfirmModal, Modal, ModalConfig, ModalStack, StandardButton};
use helios_core::record::{Record, RecordSet, SaveOptions};
use helios_core::view::{ListBinding, ViewRef};
use helios_core::{CoreError, CoreResult};
use helios_provider::{Fields, HttpResourceClient, ResourceClient};

pub use catalog::Catalog;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use views::CatalogViews;

const DELETE_PHOTOGRAPH: &str = "Are you sure you want to delete this photograph?";

/// Application state.
///
/// Every front end constructs this once at startup via `AppStateBuilder`.
pub struct AppState {
    pub config: AppConfig,
    /// Resource client shared by every remote operation
    pub client: Arc<dyn ResourceClient>,
    pub catalog: Catalog,
    /// Modal stack rendered into the screen's modal container
    pub modals: ModalStack,
    pub views: CatalogViews,
}

impl AppState {
    /// Load the album list.
    pub async fn start(&self) -> CoreResult<()> {
        match self.catalog.refresh_albums(self.client.as_ref()).await {
            Ok(()) => {
                log::info!("Catalog ready: {} album(s)", self.catalog.albums().len());
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to load albums: {e}");
                Err(e)
            }
        }
    }

    /// Thumbnail grid over `photographs`, limited to the configured page size.
    pub fn thumbnail_grid(
        &self,
        photographs: &RecordSet,
        region: &Element,
        on_select: impl Fn(&Record) + 'static,
    ) -> CoreResult<ListBinding> {
        let views = self.views.clone();
        views::selectable_list(
            photographs,
            region,
            move |photograph| views.thumbnail_view(photograph),
            self.config.page_size,
            on_select,
        )
    }

    /// Open the photograph editor: cancel, delete (after confirmation) or save.
    ///
    /// # Panics
    /// The delete and save actions spawn local tasks and panic when clicked
    /// outside a [`tokio::task::LocalSet`].
    pub fn edit_photograph(&self, photograph: &Record) -> CoreResult<Modal> {
        let views = self.views.clone();
        let client = Arc::clone(&self.client);
        let save_client = Arc::clone(&self.client);

        self.modals.open(
            ModalConfig::new()
                .record(photograph)
                .view(move |region, record| -> ViewRef { views.photograph_details(region, record) })
                .buttons(vec![
                    StandardButton::cancel(),
                    StandardButton::destroy().with_action(move |modal| {
                        let (Some(stack), Some(photograph)) = (modal.stack(), modal.record()) else {
                            return;
                        };
                        if let Err(e) = confirm_delete(&stack, &client, photograph, modal) {
                            log::error!("Failed to ask for confirmation: {e}");
                        }
                    }),
                    StandardButton::save().with_action(move |modal| {
                        if let Some(photograph) = modal.record() {
                            spawn_save(&save_client, photograph);
                        }
                        modal.remove();
                    }),
                ]),
        )
    }
}

/// Ask before deleting; on yes the record is destroyed and `editor` closed.
fn confirm_delete(
    modals: &ModalStack,
    client: &Arc<dyn ResourceClient>,
    photograph: Record,
    editor: &Modal,
) -> CoreResult<ConfirmModal> {
    let client = Arc::clone(client);
    let editor = editor.downgrade();
    modals.confirm(Some(DELETE_PHOTOGRAPH), move || {
        if let Some(editor) = editor.upgrade() {
            editor.remove();
        }
        tokio::task::spawn_local(async move {
            if let Err(e) = photograph.destroy(client.as_ref()).await {
                log::error!("Failed to delete {}: {e}", photograph.url());
            }
        });
    })
}

fn spawn_save(client: &Arc<dyn ResourceClient>, photograph: Record) {
    let client = Arc::clone(client);
    tokio::task::spawn_local(async move {
        if let Err(e) = photograph
            .save(client.as_ref(), Fields::new(), SaveOptions::default())
            .await
        {
            log::error!("Failed to save {}: {e}", photograph.url());
        }
    });
}

/// Builder for constructing `AppState`.
///
/// # Optional
/// - `config` — defaults to `AppConfig::default()`
/// - `client` — defaults to an `HttpResourceClient` built from the config
/// - `modal_container` — defaults to a detached `div#modals`
pub struct AppStateBuilder {
    config: Option<AppConfig>,
    client: Option<Arc<dyn ResourceClient>>,
    modal_container: Option<Element>,
}

impl AppStateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: None,
            client: None,
            modal_container: None,
        }
    }

    #[must_use]
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    #[must_use]
    pub fn client(mut self, client: Arc<dyn ResourceClient>) -> Self {
        self.client = Some(client);
        self
    }

    #[must_use]
    pub fn modal_container(mut self, container: Element) -> Self {
        self.modal_container = Some(container);
        self
    }

    /// Build the `AppState`.
    ///
    /// # Errors
    /// Fails if the default HTTP client cannot be constructed.
    pub fn build(self) -> AppResult<AppState> {
        let config = self.config.unwrap_or_default();
        let client = match self.client {
            Some(client) => client,
            None => {
                let http = HttpResourceClient::new(config.client_config()).map_err(CoreError::from)?;
                Arc::new(http)
            }
        };
        let container = self
            .modal_container
            .unwrap_or_else(|| Element::new("div").with_attr("id", "modals"));

        Ok(AppState {
            config,
            client,
            catalog: Catalog::new(),
            modals: ModalStack::new(&container),
            views: CatalogViews::new()?,
        })
    }
}

impl Default for AppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
