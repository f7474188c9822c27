use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "ledgerdesk",
    version,
    about = "small-business inventory, sales and finance client",
    long_about = "ledgerdesk talks to the shop backend: products, sales, deliveries, transactions and expenses, plus account, dashboard and subscription calls.\n\nExamples:\n  ledgerdesk login -e owner@shop.gh\n  ledgerdesk list products --search rice --sort price --desc\n  ledgerdesk add sales --json '{\"product\": 3, \"quantity_sold\": 2, \"sale_date\": \"2024-05-01\"}'\n\nTip: Use init-config to write ~/.ledgerdesk/config.yml and keep invocations short."
)]
pub struct CliArgs {
    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        global = true,
        help_heading = "Output",
        help = "Increase log verbosity (-v, -vv)."
    )]
    pub verbose: u8,

    #[arg(
        long = "no-color",
        global = true,
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        short = 'C',
        long = "config",
        value_name = "FILE",
        global = true,
        help_heading = "Input",
        help = "Path to config file (defaults to ~/.ledgerdesk/config.yml)."
    )]
    pub config: Option<String>,

    #[arg(
        short = 'b',
        long = "backend-url",
        value_name = "URL",
        global = true,
        help_heading = "HTTP",
        help = "Backend API root URL."
    )]
    pub backend_url: Option<String>,

    #[arg(
        long = "timeout",
        value_name = "SECONDS",
        global = true,
        help_heading = "HTTP",
        help = "Request timeout in seconds."
    )]
    pub timeout: Option<u64>,

    #[arg(
        long = "proxy",
        value_name = "URL",
        global = true,
        help_heading = "HTTP",
        help = "Route requests through a proxy."
    )]
    pub proxy: Option<String>,

    #[arg(
        long = "session-file",
        value_name = "FILE",
        global = true,
        help_heading = "Input",
        help = "Where the login session is stored."
    )]
    pub session_file: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Log in and store the session.
    Login {
        #[arg(short = 'e', long = "email")]
        email: String,
        /// Password; falls back to LEDGERDESK_PASSWORD.
        #[arg(short = 'p', long = "password", env = "LEDGERDESK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create a new organization account.
    Register {
        #[arg(long = "organization")]
        organization: String,
        #[arg(short = 'e', long = "email")]
        email: String,
        #[arg(short = 'p', long = "password", env = "LEDGERDESK_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long = "country")]
        country: String,
    },
    /// Log out and forget the stored session.
    Logout,
    /// Show the profile, or update it when any field flag is given.
    Profile(ProfileArgs),
    /// Show one page of a record table.
    List(ListArgs),
    /// Create a record from a JSON payload.
    Add {
        kind: String,
        #[arg(long = "json", value_name = "JSON")]
        json: String,
    },
    /// Change fields of a record; fields left out of the JSON keep their values.
    Update {
        kind: String,
        id: u64,
        #[arg(long = "json", value_name = "JSON")]
        json: String,
    },
    /// Delete a record.
    Delete { kind: String, id: u64 },
    /// Income, expense and profit summary.
    Dashboard {
        /// Include the monthly cash flow for this year.
        #[arg(long = "year")]
        year: Option<i32>,
        /// Expense breakdown window: this_month, last_month, this_quarter or this_year.
        #[arg(long = "period", default_value = "this_month")]
        period: String,
    },
    /// List expense categories.
    Categories,
    /// List subscription plans.
    Plans,
    /// Apply a subscription upgrade after checkout.
    Upgrade {
        plan: String,
        /// Payment reference returned by a completed checkout.
        #[arg(long = "reference", conflicts_with = "failed")]
        reference: Option<String>,
        /// Report a failed checkout instead.
        #[arg(long = "failed", value_name = "REASON")]
        failed: Option<String>,
    },
    /// Write a default config file if none exists.
    InitConfig,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// products, sales, deliveries, transactions or expenses.
    pub kind: String,

    #[arg(short = 's', long = "search", value_name = "TERM")]
    pub search: Option<String>,

    #[arg(long = "sort", value_name = "FIELD")]
    pub sort: Option<String>,

    #[arg(long = "desc", requires = "sort")]
    pub desc: bool,

    /// Page number, starting at 1.
    #[arg(long = "page", value_name = "N")]
    pub page: Option<usize>,

    /// 5, 10, 25 or all.
    #[arg(long = "page-size", value_name = "SIZE")]
    pub page_size: Option<String>,

    /// text or json.
    #[arg(short = 'o', long = "format", value_name = "FORMAT")]
    pub format: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ProfileArgs {
    #[arg(long = "name")]
    pub name: Option<String>,
    #[arg(long = "display-name")]
    pub display_name: Option<String>,
    #[arg(long = "location")]
    pub location: Option<String>,
    #[arg(long = "mobile")]
    pub mobile_number: Option<String>,
    #[arg(long = "address")]
    pub address: Option<String>,
    #[arg(long = "business-type")]
    pub business_type: Option<String>,
}
