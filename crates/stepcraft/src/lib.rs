//! Stepcraft - relative page composition for building instructions.
//!
//! Given the pixel sizes of everything on a page (assembly images, step
//! numbers, parts lists, callouts, page numbers), Stepcraft computes where
//! each element goes. Parts lists are packed into columns under a
//! configurable constraint; steps are laid out on a grid or freely around
//! their image, packed into ranges, and placed on the page.

pub mod config;
pub mod layout;
pub mod pli;
pub mod structure;

mod error;

pub use stepcraft_core::{geometry, node, placement};

pub use error::{LayoutIssue, StepcraftError};
pub use layout::{ComposedPage, PlacedElement};

use log::{debug, info, trace, warn};

use config::AppConfig;
use layout::Composer;
use structure::PageDescription;

/// Composes pages against one configuration.
///
/// # Examples
///
/// ```rust
/// use stepcraft::{PageComposer, config::AppConfig, geometry::Size};
/// use stepcraft::structure::{PageDescription, Range, Step, StepGroup, StepsChild};
///
/// let group = StepGroup::default().with_range(Range::new(vec![
///     StepsChild::Step(Step::new(1, Size::new(320.0, 240.0))),
/// ]));
/// let page = PageDescription::new(Size::new(1200.0, 900.0))
///     .with_number(1)
///     .with_group(group);
///
/// let composer = PageComposer::new(AppConfig::default());
/// let composed = composer.compose(&page).expect("Failed to compose");
/// assert!(composed.element("step 1 / image").is_some());
///
/// // Or use the default config
/// let composer = PageComposer::default();
/// ```
#[derive(Debug, Default)]
pub struct PageComposer {
    config: AppConfig,
}

impl PageComposer {
    /// Create a page composer with the given configuration.
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Parse a page description from TOML.
    ///
    /// # Errors
    ///
    /// Returns `StepcraftError::Parse` with the offending span when the
    /// source is not valid TOML or does not describe a page.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use stepcraft::PageComposer;
    ///
    /// let source = r#"
    /// number = 1
    /// size = { width = 800.0, height = 600.0 }
    /// "#;
    /// let page = PageComposer::default().parse(source).expect("Failed to parse");
    /// assert_eq!(page.number, Some(1));
    /// ```
    pub fn parse(&self, source: &str) -> Result<PageDescription, StepcraftError> {
        info!("Parsing page description");

        let page: PageDescription = toml::from_str(source).map_err(|err| {
            StepcraftError::new_parse_error(err.message(), err.span(), source)
        })?;

        debug!(page:? = page.number, items = page.items.len(); "Page description parsed");
        trace!(page:?; "Parsed page");

        Ok(page)
    }

    /// Compose one page.
    ///
    /// Recoverable problems, such as a parts list that cannot satisfy its
    /// constraint or an element placed against something missing, do not
    /// fail the page: they are listed in [`ComposedPage::issues`] and the
    /// affected elements keep a best-effort position.
    ///
    /// # Errors
    ///
    /// Returns `StepcraftError` for invalid input: negative or non-finite
    /// sizes and margins, or alpha masks that do not match their thumbnail.
    pub fn compose(&self, page: &PageDescription) -> Result<ComposedPage, StepcraftError> {
        info!(page:? = page.number; "Composing page");

        let composed = Composer::new(&self.config).compose_page(page)?;
        for issue in &composed.issues {
            warn!(issue:% = issue; "Layout issue");
        }
        Ok(composed)
    }

    /// Serialise a composed page as TOML.
    ///
    /// # Errors
    ///
    /// Returns `StepcraftError::Export` if serialisation fails.
    pub fn to_toml(&self, page: &ComposedPage) -> Result<String, StepcraftError> {
        toml::to_string_pretty(page).map_err(|err| StepcraftError::Export(err.to_string()))
    }
}
