use clap::Parser;

use pgsql_text_adapter::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about = "Print PostgreSQL table metadata as JSON")]
struct Args {
    #[arg(long, default_value = "localhost")]
    host: String,
    #[arg(long, default_value_t = pgsql_text_adapter::config::DEFAULT_PORT)]
    port: u16,
    #[arg(long)]
    dbname: String,
    #[arg(long)]
    user: String,
    #[arg(long, default_value = "")]
    password: String,
    /// Table to describe
    #[arg(long, required_unless_present = "list_tables")]
    table: Option<String>,
    #[arg(long)]
    schema: Option<String>,
    #[arg(long, value_enum, default_value = "natural")]
    case_folding: CaseFolding,
    /// Print table names instead of describing a table
    #[arg(long)]
    list_tables: bool,
}

fn run(args: Args) -> Result<String, Box<dyn std::error::Error>> {
    let config = ConnectionConfig::new(args.host, args.dbname, args.user)
        .with_port(args.port)
        .with_password(args.password)
        .with_case_folding(args.case_folding);
    let mut conn = Connection::new(config);

    let json = if args.list_tables {
        serde_json::to_string_pretty(&conn.list_tables()?)?
    } else {
        let table = args.table.unwrap_or_default();
        let description = conn.describe_table(&table, args.schema.as_deref())?;
        serde_json::to_string_pretty(&description)?
    };
    conn.close_connection();
    Ok(json)
}

fn main() {
    let args = Args::parse();
    match run(args) {
        Ok(json) => println!("{json}"),
        Err(err) => {
            eprintln!("pg-describe: {err}");
            std::process::exit(1);
        }
    }
}
