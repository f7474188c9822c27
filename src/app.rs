use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{error::ErrorKind, CommandFactory, Parser};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::debug;

use crate::account::{AccountError, AccountService, CheckoutOutcome};
use crate::auth::{AuthContext, FileTokenStore};
use crate::cli::args::{CliArgs, Command, ListArgs, ProfileArgs};
use crate::cli::validation;
use crate::client::{ApiClient, ApiError, HttpTransport};
use crate::config::{self, ConfigFile};
use crate::editor::{DialogError, EditorDialog, Mutation, RecordEditor};
use crate::output::{self, OutputFormat, TerminalNotifier};
use crate::records::account::{ProfileUpdate, RegisterRequest};
use crate::records::{
    Delivery, Expense, Product, Record, RecordId, RecordKind, Sale, Transaction,
};
use crate::store::{FetchOutcome, RemoteCollectionStore};
use crate::view::{PageSize, PageWindow, SortKey, TableView};

#[derive(Clone, Debug)]
struct RunConfig {
    command: Command,
    backend_url: String,
    timeout: u64,
    proxy: Option<String>,
    session_path: PathBuf,
    page_size: PageSize,
    output_format: OutputFormat,
    no_color: bool,
    verbose: u8,
}

fn build_run_config(args: CliArgs, cfg: ConfigFile) -> Result<RunConfig, String> {
    validation::validate(&args)?;

    let no_color = args.no_color || cfg.no_color.unwrap_or(false);
    let timeout = args.timeout.or(cfg.timeout).unwrap_or(10);
    if timeout == 0 {
        return Err("invalid timeout in config, expected positive integer".to_string());
    }
    let proxy = args
        .proxy
        .or(cfg.proxy.clone())
        .filter(|p| !p.trim().is_empty());
    let backend_url = config::resolve_backend_url(args.backend_url, &cfg);

    let session_path = match args.session_file.or(cfg.session_file.clone()) {
        Some(raw) => config::expand_tilde(&raw),
        None => config::default_session_path()
            .ok_or_else(|| "could not determine home directory, pass --session-file".to_string())?,
    };

    let page_size = match cfg.page_size.as_deref() {
        Some(raw) => validation::parse_page_size(raw)?,
        None => PageSize::default(),
    };
    let output_format = match cfg.output_format.as_deref() {
        Some(raw) => validation::parse_format(raw)?,
        None => OutputFormat::default(),
    };

    Ok(RunConfig {
        command: args.command,
        backend_url,
        timeout,
        proxy,
        session_path,
        page_size,
        output_format,
        no_color,
        verbose: args.verbose,
    })
}

fn print_warning(message: &str) {
    eprintln!(
        "{}{}{} {}",
        "[".bold().white(),
        "WRN".bold().yellow(),
        "]".bold().white(),
        message
    );
}

fn spinner(message: String) -> Result<ProgressBar, String> {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_style(
        ProgressStyle::with_template(":: {spinner} {msg} [{elapsed_precise}]")
            .map_err(|e| format!("failed to build progress style: {e}"))?,
    );
    pb.set_message(message);
    Ok(pb)
}

fn describe(e: &ApiError) -> String {
    if e.needs_login() {
        format!("{e}; run `ledgerdesk login` to sign in again")
    } else {
        e.to_string()
    }
}

fn describe_account(e: &AccountError) -> String {
    match e {
        AccountError::Api(api) => describe(api),
        other => other.to_string(),
    }
}

macro_rules! for_kind {
    ($kind:expr, $func:ident($($arg:expr),*)) => {
        match $kind {
            RecordKind::Product => $func::<Product>($($arg),*).await?,
            RecordKind::Sale => $func::<Sale>($($arg),*).await?,
            RecordKind::Delivery => $func::<Delivery>($($arg),*).await?,
            RecordKind::Transaction => $func::<Transaction>($($arg),*).await?,
            RecordKind::Expense => $func::<Expense>($($arg),*).await?,
        }
    };
}

async fn list<R: Record>(client: &ApiClient, run: &RunConfig, args: &ListArgs) -> Result<(), String> {
    let store = RemoteCollectionStore::<R>::new(client.clone());
    let pb = spinner(format!("fetching {}s", R::KIND.label()))?;
    let fetched = store.fetch().await;
    pb.finish_and_clear();
    fetched.map_err(|e| describe(&e))?;

    let mut view = TableView::for_kind(R::KIND);
    if let Some(term) = args.search.as_deref() {
        view.set_search(term);
    }
    if let Some(field) = args.sort.as_deref() {
        if let Some(first) = store.records().first() {
            if first.field(field).is_none() {
                return Err(format!("unknown sort field '{field}' for {}s", R::KIND.label()));
            }
        }
        view.sort = Some(if args.desc {
            SortKey::descending(field)
        } else {
            SortKey::ascending(field)
        });
    }
    let size = match args.page_size.as_deref() {
        Some(raw) => validation::parse_page_size(raw)?,
        None => run.page_size,
    };
    let requested = args.page.unwrap_or(1).saturating_sub(1);
    view.window = PageWindow::new(requested, size);

    let page = store.render(&mut view);
    store.close();
    if page.page != requested {
        print_warning(&format!(
            "page {} is out of range, showing page {}",
            requested + 1,
            page.page + 1
        ));
    }

    let format = match args.format.as_deref() {
        Some(raw) => validation::parse_format(raw)?,
        None => run.output_format,
    };
    match format {
        OutputFormat::Json => {
            let mut body = output::render_json(&page.rows);
            body.push(b'\n');
            print!("{}", String::from_utf8_lossy(&body));
        }
        OutputFormat::Text => print!("{}", output::render_table(R::KIND, &page)),
    }
    Ok(())
}

#[derive(Clone, Debug)]
enum Change {
    Create(String),
    Update(u64, String),
    Delete(u64),
}

fn parse_draft<R: Record>(json: &str) -> Result<R::Draft, String> {
    serde_json::from_str(json).map_err(|e| format!("invalid {} payload: {e}", R::KIND.label()))
}

async fn mutate<R: Record>(client: &ApiClient, change: Change) -> Result<(), String> {
    let store = RemoteCollectionStore::<R>::new(client.clone());
    let editor = RecordEditor::<R>::new(
        client.clone(),
        Arc::new(TerminalNotifier),
        store.refresh_hook(),
    );

    let mutation = match change {
        Change::Create(json) => Mutation::Create(parse_draft::<R>(&json)?),
        Change::Update(id, json) => {
            let changes: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&json)
                .map_err(|e| format!("invalid {} payload: {e}", R::KIND.label()))?;
            let pb = spinner(format!("loading {} {id}", R::KIND.label()))?;
            let prefilled = editor.prefill(RecordId(id), changes).await;
            pb.finish_and_clear();
            Mutation::Update(RecordId(id), prefilled.map_err(|e| describe(&e))?)
        }
        Change::Delete(id) => Mutation::Delete(RecordId(id)),
    };

    let mut dialog = EditorDialog::new();
    dialog.open(mutation).map_err(|e| e.to_string())?;

    let pb = spinner(format!("saving {}", R::KIND.label()))?;
    let submitted = dialog.submit(&editor, |m| m).await;
    pb.finish_and_clear();
    match submitted {
        Ok(()) => {}
        // The notifier already reported the failure.
        Err(DialogError::Request(e)) if !e.needs_login() => return Err(String::new()),
        Err(DialogError::Request(e)) => return Err(describe(&e)),
        Err(e) => return Err(e.to_string()),
    }

    if store.take_refresh_request() {
        debug!(kind = %R::KIND, "refreshing after mutation");
        match store.fetch().await {
            Ok(FetchOutcome::Applied { records }) => {
                println!("{}", output::format_kv_line("Records", &records.to_string()));
            }
            Ok(_) => {}
            Err(e) => print_warning(&format!("saved, but reloading failed: {}", describe(&e))),
        }
    }
    store.close();
    Ok(())
}

async fn profile(account: &AccountService, args: &ProfileArgs) -> Result<(), String> {
    let update = ProfileUpdate {
        name: args.name.clone(),
        display_name: args.display_name.clone(),
        location: args.location.clone(),
        mobile_number: args.mobile_number.clone(),
        address: args.address.clone(),
        business_type: args.business_type.clone(),
    };
    let fetched = if update.is_empty() {
        account.profile().await
    } else {
        account.update_profile(&update).await
    };
    let profile = fetched.map_err(|e| describe_account(&e))?;
    if !update.is_empty() {
        println!("{}", output::format_kv_line("Profile", "updated"));
    }
    print!("{}", output::render_profile(&profile));
    Ok(())
}

async fn run_async(run: RunConfig) -> Result<(), String> {
    let transport = HttpTransport::new(run.timeout, run.proxy.as_deref()).map_err(|e| e.to_string())?;
    let auth = AuthContext::new(Arc::new(FileTokenStore::new(&run.session_path)));
    let client =
        ApiClient::new(&run.backend_url, Arc::new(transport), auth).map_err(|e| e.to_string())?;
    debug!(backend = %client.base_url(), "client ready");
    let account = AccountService::new(client.clone());

    match run.command.clone() {
        Command::Login { email, password } => {
            let session = account
                .login(&email, &password)
                .await
                .map_err(|e| describe_account(&e))?;
            println!("{}", output::format_kv_line("Logged in", &email));
            if let Some(id) = session.user_id {
                println!("{}", output::format_kv_line("User", &id.to_string()));
            }
        }
        Command::Register {
            organization,
            email,
            password,
            country,
        } => {
            let request = RegisterRequest {
                organization_name: organization,
                email: email.clone(),
                password,
                country,
            };
            account
                .register(&request)
                .await
                .map_err(|e| describe_account(&e))?;
            println!("{}", output::format_kv_line("Registered", &email));
        }
        Command::Logout => {
            if let Err(e) = account.logout().await {
                print_warning(&format!("server logout failed: {}", describe_account(&e)));
            }
            println!("{}", output::format_kv_line("Session", "cleared"));
        }
        Command::Profile(args) => profile(&account, &args).await?,
        Command::List(args) => {
            let kind = validation::parse_kind(&args.kind)?;
            for_kind!(kind, list(&client, &run, &args));
        }
        Command::Add { kind, json } => {
            let kind = validation::parse_kind(&kind)?;
            for_kind!(kind, mutate(&client, Change::Create(json.clone())));
        }
        Command::Update { kind, id, json } => {
            let kind = validation::parse_kind(&kind)?;
            for_kind!(kind, mutate(&client, Change::Update(id, json.clone())));
        }
        Command::Delete { kind, id } => {
            let kind = validation::parse_kind(&kind)?;
            for_kind!(kind, mutate(&client, Change::Delete(id)));
        }
        Command::Dashboard { year, period } => {
            let details = account.dashboard().await.map_err(|e| describe_account(&e))?;
            let cashflow = match year {
                Some(year) => account
                    .cashflow(year)
                    .await
                    .map_err(|e| describe_account(&e))?,
                None => Vec::new(),
            };
            let breakdown = account
                .expense_breakdown()
                .await
                .map_err(|e| describe_account(&e))?;
            let top = account
                .top_products()
                .await
                .map_err(|e| describe_account(&e))?;
            print!("{}", output::render_dashboard(&details, &cashflow));
            println!();
            print!(
                "{}",
                output::render_expense_breakdown(&period, breakdown.period(&period))
            );
            println!();
            print!("{}", output::render_top_products(&top));
        }
        Command::Categories => {
            let categories = account
                .expense_categories()
                .await
                .map_err(|e| describe_account(&e))?;
            for category in &categories {
                println!(
                    "{}",
                    output::format_kv_line(&category.id.to_string(), &category.name)
                );
            }
        }
        Command::Plans => {
            let plans = account.plans().await.map_err(|e| describe_account(&e))?;
            print!("{}", output::render_plans(&plans));
        }
        Command::Upgrade {
            plan,
            reference,
            failed,
        } => {
            let outcome = match (reference, failed) {
                (Some(reference), _) => CheckoutOutcome::Completed { reference },
                (None, Some(reason)) => CheckoutOutcome::Failed { reason },
                (None, None) => return Err("upgrade needs --reference or --failed".to_string()),
            };
            let reference = account
                .complete_checkout(outcome, &plan)
                .await
                .map_err(|e| describe_account(&e))?;
            println!("{}", output::format_kv_line("Upgraded", &plan));
            println!("{}", output::format_kv_line("Reference", &reference));
        }
        // Written before the runtime starts.
        Command::InitConfig => {}
    }
    Ok(())
}

fn init_config(path: Option<PathBuf>) -> Result<(), String> {
    let path = path
        .or_else(config::default_config_path)
        .ok_or_else(|| "could not determine home directory, pass --config".to_string())?;
    if config::ensure_default_config_file(&path)? {
        println!("{}", output::format_kv_line("Config", &format!("created {}", path.display())));
    } else {
        println!("{}", output::format_kv_line("Config", &format!("exists {}", path.display())));
    }
    Ok(())
}

pub fn run_cli() -> Result<(), String> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                print!("{e}");
                return Ok(());
            }
            ErrorKind::DisplayVersion => {
                let cmd = CliArgs::command();
                print!("{}", cmd.render_version());
                return Ok(());
            }
            _ => return Err(e.to_string()),
        },
    };

    let user_config_path = args.config.clone().map(|p| config::expand_tilde(&p));
    if matches!(args.command, Command::InitConfig) {
        return init_config(user_config_path);
    }
    let cfg = match user_config_path.as_ref() {
        Some(path) => config::load_config(path, false)?,
        None => match config::default_config_path() {
            Some(path) => config::load_config(&path, true)?,
            None => ConfigFile::default(),
        },
    };

    let run = build_run_config(args, cfg)?;
    if run.no_color {
        colored::control::set_override(false);
    }
    crate::logging::init(run.verbose, run.no_color);

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .build()
        .map_err(|e| format!("failed to build runtime: {e}"))?;

    rt.block_on(run_async(run))
}
