use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "tindahan",
    version,
    about = "Local sari-sari store inventory and price-check tooling"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Add(AddArgs),
    Edit(EditArgs),
    Remove(RemoveArgs),
    Clear(ClearArgs),
    List(ListArgs),
    Search(SearchArgs),
    Price(PriceArgs),
    Import(ImportArgs),
    Export(ExportArgs),
    Category(CategoryArgs),
    Activity(ActivityArgs),
    Status(StatusArgs),
}

/// Store location and write-context flags shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    #[arg(long, default_value = ".tindahan")]
    pub store_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long, default_value = "admin")]
    pub actor: String,

    #[arg(long)]
    pub session_token: Option<String>,
}

impl StoreArgs {
    pub fn resolved_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| self.store_root.join("tindahan.sqlite"))
    }
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub price: Option<f64>,

    #[arg(long, default_value_t = 0)]
    pub stock: u32,

    #[arg(long)]
    pub category: Option<String>,

    /// Pack size when the item is sold in bulk; requires --bulk-price.
    #[arg(long)]
    pub bulk_qty: Option<u32>,

    /// Total price for one pack; requires --bulk-qty.
    #[arg(long)]
    pub bulk_price: Option<f64>,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long)]
    pub id: i64,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub price: Option<f64>,

    #[arg(long)]
    pub stock: Option<u32>,

    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub bulk_qty: Option<u32>,

    #[arg(long)]
    pub bulk_price: Option<f64>,
}

#[derive(Args, Debug, Clone)]
pub struct RemoveArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long)]
    pub id: i64,
}

#[derive(Args, Debug, Clone)]
pub struct ClearArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long, default_value_t = false)]
    pub yes: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum SortFieldArg {
    Name,
    Price,
    Stock,
    Category,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum SortDirectionArg {
    Asc,
    Desc,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long, value_enum, default_value_t = SortFieldArg::Name)]
    pub sort_by: SortFieldArg,

    #[arg(long, value_enum, default_value_t = SortDirectionArg::Asc)]
    pub direction: SortDirectionArg,

    /// Storefront view: only items with stock on hand.
    #[arg(long, default_value_t = false)]
    pub in_stock_only: bool,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum SearchModeArg {
    Exact,
    Smart,
}

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long)]
    pub query: String,

    #[arg(long, value_enum, default_value_t = SearchModeArg::Smart)]
    pub mode: SearchModeArg,

    #[arg(long, default_value_t = 20)]
    pub limit: usize,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PriceArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// A quantity followed by the item name, e.g. "7 v fresh".
    #[arg(long)]
    pub query: String,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ImportLayout {
    /// Sectioned sheet first, category-column fallback.
    Auto,
    /// Interactive upload heuristics: header auto-detection, fixed column
    /// order when headerless.
    Flexible,
}

impl ImportLayout {
    pub fn as_str(self) -> &'static str {
        match self {
            ImportLayout::Auto => "auto",
            ImportLayout::Flexible => "flexible",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long)]
    pub file: PathBuf,

    /// Worksheet name; the first sheet when omitted.
    #[arg(long)]
    pub sheet: Option<String>,

    #[arg(long, value_enum, default_value_t = ImportLayout::Auto)]
    pub layout: ImportLayout,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long)]
    pub out: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct CategoryArgs {
    #[command(subcommand)]
    pub command: CategoryCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CategoryCommand {
    Add(CategoryAddArgs),
    List(CategoryListArgs),
    Rename(CategoryRenameArgs),
    Remove(CategoryRemoveArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CategoryAddArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct CategoryListArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CategoryRenameArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long)]
    pub from: String,

    #[arg(long)]
    pub to: String,
}

#[derive(Args, Debug, Clone)]
pub struct CategoryRemoveArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long)]
    pub name: String,
}

#[derive(Args, Debug, Clone)]
pub struct ActivityArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[command(flatten)]
    pub store: StoreArgs,
}
