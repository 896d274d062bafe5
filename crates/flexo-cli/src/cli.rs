//! Command line definitions and handlers

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use flexo_core::{
    DEFAULT_ROW_CAP, Field, FilteredRecords, RecordFilter, RecordForm, RecordPatch, TableId, schema,
};
use flexo_store::TableManager;

#[derive(Debug, Parser)]
#[command(name = "flexo")]
#[command(about = "Order, delivery note and invoice records for customers and suppliers", long_about = None)]
pub struct Cli {
    /// Section: customers/clientes or suppliers/proveedores
    #[arg(long, global = true, env = "FLEXO_SECTION", default_value = "customers")]
    pub section: String,

    /// Subsection: orders/pedidos, delivery-notes/albaranes or invoices/facturas
    #[arg(long, global = true, env = "FLEXO_SUBSECTION", default_value = "orders")]
    pub subsection: String,

    /// Log debug output to the console
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Do not log to the console; JSON file logs are unaffected
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Also write JSON logs to the log directory
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn table(&self) -> anyhow::Result<TableId> {
        TableId::parse(&self.section, &self.subsection).context("invalid table selection")
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show which storage backend is active
    Backend {
        #[arg(long)]
        json: bool,
    },
    /// List records of the selected table
    List {
        /// Case-insensitive substring of the order number
        #[arg(long)]
        order_number: Option<String>,
        /// Case-insensitive substring of the sender name
        #[arg(long)]
        sender: Option<String>,
        /// Maximum rows to show
        #[arg(long, default_value_t = DEFAULT_ROW_CAP)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Validate and append a record to the selected table
    Add(AddArgs),
    /// Change fields of every record with the given order number
    Edit(EditArgs),
    /// Delete every record with the given order number
    Delete {
        #[arg(long)]
        order_number: String,
    },
}

/// Form fields for a new record; dates as DD/MM/YYYY
#[derive(Debug, Args)]
pub struct AddArgs {
    #[arg(long)]
    pub order_number: String,
    #[arg(long)]
    pub sender_name: String,
    #[arg(long, default_value = "")]
    pub sender_code: String,
    #[arg(long)]
    pub order_date: String,
    #[arg(long, default_value = "")]
    pub delivery_date: String,
    #[arg(long, default_value = "")]
    pub ean_code: String,
    #[arg(long, default_value = "")]
    pub buyer_code: String,
    #[arg(long)]
    pub description: String,
    #[arg(long)]
    pub quantity: String,
    #[arg(long = "type", default_value = "")]
    pub product_type: String,
    #[arg(long, default_value = "")]
    pub cliche_type: String,
    #[arg(long, default_value = "")]
    pub paper: String,
    #[arg(long, default_value = "")]
    pub internal_code: String,
    #[arg(long, default_value = "")]
    pub document_link: String,
}

impl From<AddArgs> for RecordForm {
    fn from(args: AddArgs) -> Self {
        RecordForm {
            order_number: args.order_number,
            sender_name: args.sender_name,
            sender_code: args.sender_code,
            order_date: args.order_date,
            delivery_date: args.delivery_date,
            ean_code: args.ean_code,
            buyer_code: args.buyer_code,
            description: args.description,
            quantity: args.quantity,
            product_type: args.product_type,
            cliche_type: args.cliche_type,
            paper: args.paper,
            internal_code: args.internal_code,
            document_link: args.document_link,
        }
    }
}

/// Fields to change on existing records; omitted fields are kept
#[derive(Debug, Args)]
pub struct EditArgs {
    /// Order number of the records to edit
    #[arg(long)]
    pub order_number: String,
    #[arg(long)]
    pub new_order_number: Option<String>,
    #[arg(long)]
    pub sender_name: Option<String>,
    #[arg(long)]
    pub sender_code: Option<String>,
    #[arg(long)]
    pub order_date: Option<String>,
    /// An empty value clears the delivery date
    #[arg(long)]
    pub delivery_date: Option<String>,
    #[arg(long)]
    pub ean_code: Option<String>,
    #[arg(long)]
    pub buyer_code: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub quantity: Option<String>,
    #[arg(long = "type")]
    pub product_type: Option<String>,
    #[arg(long)]
    pub cliche_type: Option<String>,
    #[arg(long)]
    pub paper: Option<String>,
    #[arg(long)]
    pub internal_code: Option<String>,
    #[arg(long)]
    pub document_link: Option<String>,
}

impl EditArgs {
    fn patch(self) -> (String, RecordPatch) {
        let patch = RecordPatch::new()
            .set_opt(Field::OrderNumber, self.new_order_number)
            .set_opt(Field::SenderName, self.sender_name)
            .set_opt(Field::SenderCode, self.sender_code)
            .set_opt(Field::OrderDate, self.order_date)
            .set_opt(Field::DeliveryDate, self.delivery_date)
            .set_opt(Field::EanCode, self.ean_code)
            .set_opt(Field::BuyerCode, self.buyer_code)
            .set_opt(Field::Description, self.description)
            .set_opt(Field::Quantity, self.quantity)
            .set_opt(Field::ProductType, self.product_type)
            .set_opt(Field::ClicheType, self.cliche_type)
            .set_opt(Field::Paper, self.paper)
            .set_opt(Field::InternalCode, self.internal_code)
            .set_opt(Field::DocumentLink, self.document_link);
        (self.order_number, patch)
    }
}

/// Run one command against the manager, returning what to print
pub async fn run(manager: &TableManager, table: TableId, command: Command) -> anyhow::Result<String> {
    match command {
        Command::Backend { json } => {
            if json {
                Ok(serde_json::to_string_pretty(manager.selection())?)
            } else {
                let mut line = format!("backend: {}", manager.backend_kind());
                if let flexo_store::BackendSelection::CsvFallback { reason } = manager.selection() {
                    line.push_str(&format!(" (fallback: {reason})"));
                }
                Ok(line)
            }
        }
        Command::List {
            order_number,
            sender,
            limit,
            json,
        } => {
            let filter = RecordFilter::new()
                .order_number(order_number.unwrap_or_default())
                .sender_name(sender.unwrap_or_default())
                .max_rows(limit);
            let data = manager.get_table(table).await;
            let listing = filter.apply(&data);
            tracing::debug!(
                table = %table.physical_name(),
                total = listing.total_matches,
                shown = listing.records.len(),
                "listed records"
            );
            if json {
                Ok(serde_json::to_string_pretty(&listing.records)?)
            } else {
                Ok(render_listing(&listing))
            }
        }
        Command::Add(args) => {
            let record = RecordForm::from(args).validate()?;
            let order_number = record.order_number.clone();
            let report = manager
                .append_record(table, record)
                .await
                .with_context(|| format!("failed to save {table}"))?;
            Ok(format!(
                "added order {order_number} to {table} ({} rows, {})",
                report.rows_written, report.backend
            ))
        }
        Command::Edit(args) => {
            let (order_number, patch) = args.patch();
            if patch.is_empty() {
                anyhow::bail!("nothing to change: pass at least one field to edit");
            }
            let edit = patch.validate()?;
            let needle = order_number.trim().to_string();
            let updated = manager
                .update_where(table, |r| r.order_number.trim() == needle, &edit)
                .await
                .with_context(|| format!("failed to update {table}"))?;
            if updated == 0 {
                anyhow::bail!("no record with order number {needle} in {table}");
            }
            Ok(format!("updated {updated} record(s) in {table}"))
        }
        Command::Delete { order_number } => {
            let needle = order_number.trim().to_string();
            let removed = manager
                .delete_where(table, |r| r.order_number.trim() == needle)
                .await
                .with_context(|| format!("failed to delete from {table}"))?;
            if removed == 0 {
                anyhow::bail!("no record with order number {needle} in {table}");
            }
            Ok(format!("deleted {removed} record(s) from {table}"))
        }
    }
}

pub fn render_listing(listing: &FilteredRecords) -> String {
    let mut table = comfy_table::Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL_CONDENSED);
    table.set_header(schema::display_names());
    for record in &listing.records {
        table.add_row(schema::fields().iter().map(|f| record.display_text(*f)));
    }

    let mut out = table.to_string();
    if listing.truncated {
        out.push_str(&format!(
            "\nshowing {} of {} matching records",
            listing.records.len(),
            listing.total_matches
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use flexo_core::{Record, Section, Subsection, Table};
    use flexo_store::StoreConfig;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("flexo").chain(args.iter().copied())).unwrap()
    }

    fn add_command(order_number: &str, quantity: &str) -> Command {
        Command::Add(AddArgs {
            order_number: order_number.into(),
            sender_name: "Acme".into(),
            sender_code: String::new(),
            order_date: "12/06/2025".into(),
            delivery_date: String::new(),
            ean_code: String::new(),
            buyer_code: String::new(),
            description: "Labels".into(),
            quantity: quantity.into(),
            product_type: String::new(),
            cliche_type: String::new(),
            paper: String::new(),
            internal_code: String::new(),
            document_link: String::new(),
        })
    }

    #[test]
    fn table_labels_accept_both_languages() {
        let cli = parse(&["--section", "proveedores", "--subsection", "albaranes", "backend"]);
        assert_eq!(
            cli.table().unwrap(),
            TableId::new(Section::Suppliers, Subsection::DeliveryNotes)
        );

        let cli = parse(&["list", "--section", "bogus"]);
        assert!(cli.table().is_err());
    }

    #[test]
    fn quiet_and_verbose_are_exclusive() {
        assert!(parse(&["--quiet", "backend"]).quiet);
        assert!(!parse(&["backend"]).quiet);
        assert!(Cli::try_parse_from(["flexo", "-q", "-v", "backend"]).is_err());
    }

    #[test]
    fn add_requires_the_mandatory_fields() {
        assert!(Cli::try_parse_from(["flexo", "add", "--order-number", "1"]).is_err());
    }

    #[test]
    fn listing_reports_truncation() {
        let table = Table::from_records(
            (0..3)
                .map(|i| Record {
                    order_number: format!("P-{i}"),
                    ..Default::default()
                })
                .collect(),
        );
        let listing = RecordFilter::new().max_rows(2).apply(&table);
        let out = render_listing(&listing);
        assert!(out.contains("Num_Pedido"));
        assert!(out.contains("P-1"));
        assert!(!out.contains("P-2"));
        assert!(out.ends_with("showing 2 of 3 matching records"));
    }

    #[tokio::test]
    async fn add_list_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let manager = TableManager::from_config(&StoreConfig::csv(dir.path()))
            .await
            .unwrap();
        let table = TableId::new(Section::Customers, Subsection::Orders);

        run(&manager, table, add_command("100001", "1000")).await.unwrap();
        run(&manager, table, add_command("100002", "5")).await.unwrap();

        let out = run(
            &manager,
            table,
            Command::List {
                order_number: Some("0002".into()),
                sender: None,
                limit: DEFAULT_ROW_CAP,
                json: false,
            },
        )
        .await
        .unwrap();
        assert!(out.contains("100002"));
        assert!(!out.contains("100001"));
        assert!(out.contains("12/06/2025"));

        let out = run(
            &manager,
            table,
            Command::Delete {
                order_number: "100001".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(out, "deleted 1 record(s) from Customers / Orders");
        assert_eq!(manager.get_table(table).await.len(), 1);
    }

    fn edit_command(order_number: &str, args: &[&str]) -> Command {
        let cli = Cli::try_parse_from(
            ["flexo", "edit", "--order-number", order_number]
                .into_iter()
                .chain(args.iter().copied()),
        )
        .unwrap();
        cli.command
    }

    #[tokio::test]
    async fn edit_changes_only_the_given_fields() {
        let dir = tempfile::tempdir().unwrap();
        let manager = TableManager::from_config(&StoreConfig::csv(dir.path()))
            .await
            .unwrap();
        let table = TableId::new(Section::Customers, Subsection::Orders);
        run(&manager, table, add_command("100001", "1000")).await.unwrap();
        run(&manager, table, add_command("100002", "5")).await.unwrap();

        let out = run(
            &manager,
            table,
            edit_command("100002", &["--quantity", "40", "--paper", "Kraft"]),
        )
        .await
        .unwrap();
        assert_eq!(out, "updated 1 record(s) in Customers / Orders");

        let stored = manager.get_table(table).await;
        assert_eq!(stored.records()[0].quantity, 1000);
        assert_eq!(stored.records()[1].quantity, 40);
        assert_eq!(stored.records()[1].paper, "Kraft");
        assert_eq!(stored.records()[1].description, "Labels");
    }

    #[tokio::test]
    async fn invalid_or_empty_edits_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let manager = TableManager::from_config(&StoreConfig::csv(dir.path()))
            .await
            .unwrap();
        let table = TableId::new(Section::Customers, Subsection::Orders);
        run(&manager, table, add_command("100001", "1000")).await.unwrap();

        let err = run(&manager, table, edit_command("100001", &["--order-date", "2025-06-12"]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("DD/MM/YYYY"));
        assert!(run(&manager, table, edit_command("100001", &[])).await.is_err());
        assert!(
            run(&manager, table, edit_command("999", &["--paper", "Kraft"]))
                .await
                .is_err()
        );
        assert_eq!(manager.get_table(table).await.records()[0].paper, "");
    }

    #[tokio::test]
    async fn invalid_form_is_rejected_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let manager = TableManager::from_config(&StoreConfig::csv(dir.path()))
            .await
            .unwrap();
        let table = TableId::new(Section::Customers, Subsection::Orders);

        let err = run(&manager, table, add_command("100001", "0")).await.unwrap_err();
        assert!(err.to_string().contains("Quantity must be greater than 0"));
        assert!(manager.get_table(table).await.is_empty());
    }

    #[tokio::test]
    async fn deleting_an_unknown_order_fails() {
        let dir = tempfile::tempdir().unwrap();
        let manager = TableManager::from_config(&StoreConfig::csv(dir.path()))
            .await
            .unwrap();
        let table = TableId::new(Section::Suppliers, Subsection::Invoices);

        let result = run(
            &manager,
            table,
            Command::Delete {
                order_number: "nope".into(),
            },
        )
        .await;
        assert!(result.is_err());
    }
}
