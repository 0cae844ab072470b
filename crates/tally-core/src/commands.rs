use anyhow::{Context, anyhow};
use chrono::{Local, NaiveDate};
use tracing::{debug, info, instrument, warn};

use crate::analytics;
use crate::cli::Invocation;
use crate::config::Config;
use crate::dates::parse_due_expr;
use crate::render::Renderer;
use crate::store::Store;
use crate::task::order_for_display;

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "add",
        "list",
        "done",
        "modify",
        "delete",
        "category",
        "categories",
        "stats",
        "help",
        "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(store, cfg, renderer, inv))]
pub fn dispatch(
    store: &mut Store,
    cfg: &Config,
    renderer: &mut Renderer,
    inv: Invocation,
) -> anyhow::Result<()> {
    let today = Local::now().date_naive();
    let command = inv.command.as_str();

    debug!(command, args = ?inv.args, "dispatching command");

    match command {
        "add" => cmd_add(store, &inv.args, today),
        "list" => cmd_list(store, renderer, today),
        "done" => cmd_done(store, &inv.args),
        "modify" => cmd_modify(store, &inv.args, today),
        "delete" => cmd_delete(store, &inv.args),
        "category" | "categories" => cmd_category(store, cfg, renderer, &inv.args),
        "stats" => cmd_stats(store, renderer),
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

#[instrument(skip(store, args, today))]
fn cmd_add(store: &mut Store, args: &[String], today: NaiveDate) -> anyhow::Result<()> {
    info!("command add");

    let (text, mods) = parse_text_and_mods(args, today)?;
    let mut due = None;
    let mut categories = Vec::new();
    apply_mods(&mut due, &mut categories, &mods);

    let id = store.add_task(&text, due, categories)?;
    println!("Created task {id}.");
    Ok(())
}

#[instrument(skip(store, renderer, today))]
fn cmd_list(store: &mut Store, renderer: &mut Renderer, today: NaiveDate) -> anyhow::Result<()> {
    info!("command list");

    let rows = order_for_display(store.tasks());
    renderer.print_task_table(&rows, today)?;
    Ok(())
}

#[instrument(skip(store, args))]
fn cmd_done(store: &mut Store, args: &[String]) -> anyhow::Result<()> {
    info!("command done");

    let id = parse_id(args, "done")?;
    let completed = store.toggle_complete(id)?;
    if completed {
        println!("Completed task {id}.");
    } else {
        println!("Reopened task {id}.");
    }
    Ok(())
}

#[instrument(skip(store, args, today))]
fn cmd_modify(store: &mut Store, args: &[String], today: NaiveDate) -> anyhow::Result<()> {
    info!("command modify");

    let Some((selector, rest)) = args.split_first() else {
        return Err(anyhow!("modify requires a task id"));
    };
    let id: u64 = selector
        .parse()
        .with_context(|| format!("invalid task id: {selector}"))?;

    let (text, mods) = parse_text_and_mods(rest, today)?;

    // Start from the current field values, the way the original edit dialog
    // pre-fills them; supplied tokens replace or adjust from there.
    let current = store.task(id)?;
    let mut due = current.due;
    let mut categories = current.categories.clone();
    let text = if text.is_empty() { current.text.clone() } else { text };
    apply_mods(&mut due, &mut categories, &mods);

    store.edit_task(id, &text, due, categories)?;
    println!("Modified task {id}.");
    Ok(())
}

#[instrument(skip(store, args))]
fn cmd_delete(store: &mut Store, args: &[String]) -> anyhow::Result<()> {
    info!("command delete");

    let id = parse_id(args, "delete")?;
    store.delete_task(id)?;
    println!("Deleted task {id}.");
    Ok(())
}

#[instrument(skip(store, cfg, renderer, args))]
fn cmd_category(
    store: &mut Store,
    cfg: &Config,
    renderer: &mut Renderer,
    args: &[String],
) -> anyhow::Result<()> {
    info!("command category");

    let Some((sub, rest)) = args.split_first() else {
        return renderer.print_category_table(store.categories());
    };

    match sub.as_str() {
        "add" => {
            let name = rest.join(" ");
            let name = store.add_category(&name)?;
            println!("Created category '{name}'.");
            Ok(())
        }
        "delete" => {
            if rest.is_empty() {
                return Err(anyhow!("category delete requires a name or position"));
            }
            let selector = rest.join(" ");
            let index = store.category_index(&selector)?;
            let name = store.categories()[index].clone();

            let needs_confirmation = cfg.get_bool("confirmation").unwrap_or(true);
            if needs_confirmation {
                let prompt = format!(
                    "Deleting category '{name}' also deletes every task tagged with it. Proceed?"
                );
                if !renderer.confirm(&prompt)? {
                    println!("Category not deleted.");
                    return Ok(());
                }
            }

            let (name, removed) = store.delete_category(index)?;
            println!("Deleted category '{name}' and {removed} task(s).");
            Ok(())
        }
        "list" => renderer.print_category_table(store.categories()),
        other => Err(anyhow!(
            "unknown category subcommand: {other} (expected add, delete or list)"
        )),
    }
}

#[instrument(skip(store, renderer))]
fn cmd_stats(store: &mut Store, renderer: &mut Renderer) -> anyhow::Result<()> {
    info!("command stats");

    let overall = analytics::overall_rate(store.tasks());
    let rates = analytics::category_rates(store.tasks(), store.categories());
    renderer.print_stats(overall, &rates)?;
    Ok(())
}

fn cmd_help() -> anyhow::Result<()> {
    println!("Implemented commands: add, list, done, modify, delete, category, stats, version");
    println!();
    println!("  add <text...> [due:<date>] [+<category>...]");
    println!("  list");
    println!("  done <id>");
    println!("  modify <id> [text...] [due:<date>|due:none] [+<category>|-<category>...]");
    println!("  delete <id>");
    println!("  category [add <name> | delete <name-or-position> | list]");
    println!("  stats");
    println!();
    println!("Due dates: YYYY-MM-DD, today, tomorrow, +Nd, -Nd, none.");
    Ok(())
}

#[derive(Debug, Clone)]
enum Mod {
    CategoryAdd(String),
    CategoryRemove(String),
    Due(Option<NaiveDate>),
}

/// Split argument tokens into task text and modifiers, the `+name` /
/// `key:value` grammar. A `--` token turns everything after it into text.
#[instrument(skip(args, today))]
fn parse_text_and_mods(args: &[String], today: NaiveDate) -> anyhow::Result<(String, Vec<Mod>)> {
    let mut text_parts = Vec::new();
    let mut mods = Vec::new();

    let mut literal = false;
    for arg in args {
        if arg == "--" {
            literal = true;
            continue;
        }

        if !literal && let Some(one_mod) = parse_one_mod(arg, today)? {
            mods.push(one_mod);
            continue;
        }

        text_parts.push(arg.clone());
    }

    Ok((text_parts.join(" "), mods))
}

fn parse_one_mod(tok: &str, today: NaiveDate) -> anyhow::Result<Option<Mod>> {
    if let Some(name) = tok.strip_prefix('+') {
        return Ok(Some(Mod::CategoryAdd(name.to_string())));
    }
    if let Some(name) = tok.strip_prefix('-')
        && !name.is_empty()
        && !name.chars().all(|ch| ch.is_ascii_digit())
    {
        return Ok(Some(Mod::CategoryRemove(name.to_string())));
    }

    let (key, value) = if let Some((k, v)) = tok.split_once(':') {
        (k, v)
    } else if let Some((k, v)) = tok.split_once('=') {
        (k, v)
    } else {
        return Ok(None);
    };

    match key.to_ascii_lowercase().as_str() {
        "due" => Ok(Some(Mod::Due(parse_due_expr(value, today)?))),
        _ => Ok(None),
    }
}

/// Category names go in as given — unknown names and duplicates are stored
/// as-is, matching the loose membership model.
fn apply_mods(due: &mut Option<NaiveDate>, categories: &mut Vec<String>, mods: &[Mod]) {
    for one_mod in mods {
        match one_mod {
            Mod::CategoryAdd(name) => categories.push(name.clone()),
            Mod::CategoryRemove(name) => categories.retain(|existing| existing != name),
            Mod::Due(date) => *due = *date,
        }
    }
}

fn parse_id(args: &[String], command: &str) -> anyhow::Result<u64> {
    let Some((selector, rest)) = args.split_first() else {
        return Err(anyhow!("{command} requires a task id"));
    };
    if !rest.is_empty() {
        warn!(extra = ?rest, "extra arguments ignored");
    }
    selector
        .parse()
        .with_context(|| format!("invalid task id: {selector}"))
}
