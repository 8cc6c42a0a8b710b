//! Output formatting for products (table, JSON, markdown, CSV).

use crate::catalog::{FavoriteState, Product};
use crate::config::OutputFormat;
use crate::images::{DisplayedImage, ImageSource};
use serde::Serialize;

/// A product together with the image its resolver settled on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedProduct {
    #[serde(flatten)]
    pub product: Product,
    /// `local`, `remote`, `original` or `placeholder`
    pub image_kind: &'static str,
    pub image_url: String,
}

impl ResolvedProduct {
    pub fn new(product: Product, displayed: DisplayedImage<'_>) -> Self {
        let image_kind = match displayed {
            DisplayedImage::Source(source) => source.kind(),
            DisplayedImage::Placeholder(_) => "placeholder",
        };
        let image_url = displayed.url().to_string();
        Self { product, image_kind, image_url }
    }
}

/// Borrowed view shared by both listing shapes.
struct Row<'a> {
    product: &'a Product,
    image_kind: &'a str,
    image_url: &'a str,
}

impl<'a> Row<'a> {
    fn from_product(product: &'a Product) -> Self {
        Self {
            product,
            image_kind: product.primary_image_kind(),
            image_url: product.image_candidates.first().map(ImageSource::url).unwrap_or(""),
        }
    }

    fn from_resolved(resolved: &'a ResolvedProduct) -> Self {
        Self {
            product: &resolved.product,
            image_kind: resolved.image_kind,
            image_url: &resolved.image_url,
        }
    }
}

/// Formats products for output.
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    /// Creates a new formatter.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Formats the feed as loaded, showing each product's first image source.
    pub fn format_products(&self, products: &[Product]) -> String {
        if self.format == OutputFormat::Json {
            return Self::json(products);
        }
        let rows: Vec<Row<'_>> = products.iter().map(Row::from_product).collect();
        self.format_rows(&rows)
    }

    /// Formats products whose images were resolved.
    pub fn format_resolved(&self, products: &[ResolvedProduct]) -> String {
        if self.format == OutputFormat::Json {
            return Self::json(products);
        }
        let rows: Vec<Row<'_>> = products.iter().map(Row::from_resolved).collect();
        self.format_rows(&rows)
    }

    /// Formats the outcome of a favorite toggle.
    pub fn format_favorite(&self, state: &FavoriteState) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(state).unwrap_or_else(|_| "{}".to_string())
            }
            OutputFormat::Csv => {
                format!("product_id,is_favorite\n{},{}", state.product_id, state.is_favorite)
            }
            OutputFormat::Table | OutputFormat::Markdown => {
                if state.is_favorite {
                    format!("{} Product {} is now a favorite.", star(true), state.product_id)
                } else {
                    format!("{} Product {} is no longer a favorite.", star(false), state.product_id)
                }
            }
        }
    }

    fn format_rows(&self, rows: &[Row<'_>]) -> String {
        if rows.is_empty() {
            return match self.format {
                OutputFormat::Csv => Self::csv_header(),
                _ => "No products available.".to_string(),
            };
        }

        match self.format {
            OutputFormat::Table => Self::table(rows),
            OutputFormat::Markdown => Self::markdown(rows),
            OutputFormat::Csv | OutputFormat::Json => Self::csv(rows),
        }
    }

    fn json<T: Serialize>(products: &[T]) -> String {
        serde_json::to_string_pretty(products).unwrap_or_else(|_| "[]".to_string())
    }

    // Table formatting

    fn table(rows: &[Row<'_>]) -> String {
        let id_width = 8;
        let price_width = 10;
        let fav_width = 3;
        let image_width = 11;
        let name_width = 50;

        let mut lines = Vec::new();

        lines.push(format!(
            "{:<id_width$}  {:>price_width$}  {:<fav_width$}  {:<image_width$}  {}",
            "ID", "Price", "Fav", "Image", "Name"
        ));
        lines.push(format!(
            "{:-<id_width$}  {:-<price_width$}  {:-<fav_width$}  {:-<image_width$}  {:-<name_width$}",
            "", "", "", "", ""
        ));

        for row in rows {
            lines.push(format!(
                "{:<id_width$}  {:>price_width$}  {:<fav_width$}  {:<image_width$}  {}",
                row.product.id,
                row.product.price_label(),
                star(row.product.is_favorite),
                row.image_kind,
                truncate(&row.product.name, name_width)
            ));
        }

        lines.push(String::new());
        lines.push(format!("Total: {} products", rows.len()));

        lines.join("\n")
    }

    // Markdown formatting

    fn markdown(rows: &[Row<'_>]) -> String {
        let mut lines = Vec::new();

        lines.push("| ID | Price | Favorite | Image | Name |".to_string());
        lines.push("|----|-------|----------|-------|------|".to_string());

        for row in rows {
            let image = if row.image_url.is_empty() {
                row.image_kind.to_string()
            } else {
                format!("[{}]({})", row.image_kind, row.image_url)
            };
            let favorite = if row.product.is_favorite { star(true) } else { "" };

            lines.push(format!(
                "| {} | {} | {} | {} | {} |",
                row.product.id,
                row.product.price_label(),
                favorite,
                image,
                truncate(&row.product.name, 40).replace('|', "\\|")
            ));
        }

        lines.push(String::new());
        lines.push(format!("*{} products*", rows.len()));

        lines.join("\n")
    }

    // CSV formatting

    fn csv_header() -> String {
        "id,name,price,is_favorite,image_kind,image_url".to_string()
    }

    fn csv(rows: &[Row<'_>]) -> String {
        let mut lines = Vec::new();
        lines.push(Self::csv_header());

        for row in rows {
            let price = row.product.price.map(|p| p.to_string()).unwrap_or_default();
            lines.push(format!(
                "{},{},{},{},{},{}",
                row.product.id,
                Self::csv_escape(&row.product.name),
                price,
                row.product.is_favorite,
                row.image_kind,
                Self::csv_escape(row.image_url)
            ));
        }

        lines.join("\n")
    }

    fn csv_escape(s: &str) -> String {
        if s.contains(',') || s.contains('"') || s.contains('\n') {
            format!("\"{}\"", s.replace('"', "\"\""))
        } else {
            s.to_string()
        }
    }
}

fn star(is_favorite: bool) -> &'static str {
    if is_favorite {
        "★"
    } else {
        "☆"
    }
}

/// Shortens to `width` characters, ending in `...` when cut.
fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let kept: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        s.to_string()
    }
}
