//! Line-oriented front end over a [`Shelf`]. Each input line is one event, handled to
//! completion before the next is read.

use anyhow::Result;
use shelf_core::{BookRecord, Catalog, SearchController, SearchError, SearchStatus, Shelf, ShelfError, StateStore};
use std::io::Write;
use time::format_description::well_known::Rfc3339;

pub const HELP: &str = "\
commands:
  search <text>            look up books
  results                  show the current results
  select <category>        choose where `save` files books
  save <n>                 save result n into the selected category
  remove <id> <category>   remove a book from a category
  new <category>           create a category
  toggle <category>        expand or collapse a category in `categories`
  categories               list categories
  show <category>          list the books in a category
  recent                   recent searches
  help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Search(String),
    Results,
    Select(String),
    Save(usize),
    Remove { id: String, category: String },
    New(String),
    Toggle(String),
    Categories,
    Show(String),
    Recent,
    Help,
    Quit,
}

pub fn parse(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (line, ""),
    };
    let needs_arg = |what: &str| if rest.is_empty() { Err(format!("usage: {word} <{what}>")) } else { Ok(rest.to_string()) };
    let cmd = match word {
        "search" | "s" => Command::Search(needs_arg("text")?),
        "results" => Command::Results,
        "select" => Command::Select(needs_arg("category")?),
        "save" => {
            let n: usize = needs_arg("n")?.parse().map_err(|_| "usage: save <n>".to_string())?;
            if n == 0 {
                return Err("results are numbered from 1".into());
            }
            Command::Save(n)
        }
        "remove" | "rm" => match rest.split_once(char::is_whitespace) {
            Some((id, category)) if !category.trim().is_empty() => {
                Command::Remove { id: id.to_string(), category: category.trim().to_string() }
            }
            _ => return Err("usage: remove <id> <category>".into()),
        },
        "new" => Command::New(needs_arg("category")?),
        "toggle" => Command::Toggle(needs_arg("category")?),
        "categories" | "ls" => Command::Categories,
        "show" => Command::Show(needs_arg("category")?),
        "recent" => Command::Recent,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(format!("unknown command `{other}`, try `help`")),
    };
    Ok(Some(cmd))
}

pub struct Session<C, S> {
    pub controller: SearchController<C>,
    pub shelf: Shelf<S>,
}

impl<C: Catalog, S: StateStore> Session<C, S> {
    pub fn new(controller: SearchController<C>, shelf: Shelf<S>) -> Self { Self { controller, shelf } }

    /// Handles one input line. Returns false once the user asked to quit.
    pub async fn handle_line<W: Write>(&mut self, line: &str, out: &mut W) -> Result<bool> {
        match parse(line) {
            Ok(Some(cmd)) => self.run(cmd, out).await,
            Ok(None) => Ok(true),
            Err(msg) => {
                writeln!(out, "{msg}")?;
                Ok(true)
            }
        }
    }

    pub async fn run<W: Write>(&mut self, cmd: Command, out: &mut W) -> Result<bool> {
        match cmd {
            Command::Search(query) => {
                self.search(&query, out).await?;
            }
            Command::Results => self.print_results(out)?,
            Command::Select(name) => {
                if !self.shelf.categories().contains(&name) {
                    writeln!(out, "no category named {name}; create it with `new {name}`")?;
                } else {
                    self.shelf.select_category(&name);
                    writeln!(out, "saving into {name}")?;
                }
            }
            Command::Save(n) => {
                let Some(book) = self.shelf.results().get(n - 1).cloned() else {
                    writeln!(out, "no result #{n}")?;
                    return Ok(true);
                };
                match self.shelf.save_to_selected(book.clone()) {
                    Ok(_) => writeln!(out, "saved {} to {}", book.title, self.shelf.selected().unwrap_or_default())?,
                    Err(ShelfError::InvalidCategorySelection) => {
                        writeln!(out, "choose a category first with `select <category>`")?
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            Command::Remove { id, category } => {
                let before = self.shelf.books_in(&category).len();
                self.shelf.remove_from_category(&id, &category)?;
                let removed = before - self.shelf.books_in(&category).len();
                writeln!(out, "removed {removed} from {category}")?;
            }
            Command::New(name) => {
                let existed = self.shelf.categories().contains(name.trim());
                self.shelf.create_category(&name)?;
                if existed {
                    writeln!(out, "{} already exists", name.trim())?;
                } else {
                    writeln!(out, "created {}", name.trim())?;
                }
            }
            Command::Toggle(name) => {
                if !self.shelf.categories().contains(&name) {
                    writeln!(out, "no category named {name}")?;
                    return Ok(true);
                }
                let state = if self.shelf.toggle_visibility(&name) { "expanded" } else { "collapsed" };
                writeln!(out, "{name} {state}")?;
            }
            Command::Categories => self.print_categories(out)?,
            Command::Show(name) => {
                if !self.shelf.categories().contains(&name) {
                    writeln!(out, "no category named {name}")?;
                    return Ok(true);
                }
                writeln!(out, "{name}:")?;
                print_books(out, self.shelf.books_in(&name))?;
            }
            Command::Recent => self.print_recent(out)?,
            Command::Help => writeln!(out, "{HELP}")?,
            Command::Quit => return Ok(false),
        }
        Ok(true)
    }

    /// Runs a search and prints its outcome. Returns whether the search succeeded.
    pub async fn search<W: Write>(&mut self, query: &str, out: &mut W) -> Result<bool> {
        match self.controller.search(&mut self.shelf, query).await {
            Ok(_) => {
                self.print_results(out)?;
                Ok(true)
            }
            Err(SearchError::EmptyQuery) => {
                writeln!(out, "{}; type something after `search`", SearchError::EmptyQuery)?;
                Ok(false)
            }
            Err(_) => {
                // Catalog failures are recorded in the shelf status.
                self.print_results(out)?;
                Ok(false)
            }
        }
    }

    pub fn print_results<W: Write>(&self, out: &mut W) -> Result<()> {
        match self.shelf.status() {
            SearchStatus::NotSearched => writeln!(out, "no search yet")?,
            SearchStatus::NoResults { query } => writeln!(out, "no results for \"{query}\"")?,
            SearchStatus::Failed { query, message } => {
                writeln!(out, "search for \"{query}\" failed: {message}")?;
                if !self.shelf.results().is_empty() {
                    writeln!(out, "previous results:")?;
                    print_books(out, self.shelf.results())?;
                }
            }
            SearchStatus::Loaded { query, count } => {
                writeln!(out, "{count} results for \"{query}\":")?;
                print_books(out, self.shelf.results())?;
            }
        }
        Ok(())
    }

    pub fn print_categories<W: Write>(&self, out: &mut W) -> Result<()> {
        let selected = self.shelf.selected();
        for (name, books) in self.shelf.categories().iter() {
            let marker = if selected == Some(name) { "*" } else { " " };
            writeln!(out, "{marker} {name} ({})", books.len())?;
            if self.shelf.is_visible(name) {
                print_books(out, books)?;
            }
        }
        Ok(())
    }

    pub fn print_recent<W: Write>(&self, out: &mut W) -> Result<()> {
        if self.shelf.recent().is_empty() {
            writeln!(out, "no recent searches")?;
        }
        for entry in self.shelf.recent().entries() {
            let at = entry.at().format(&Rfc3339).unwrap_or_default();
            writeln!(out, "{at}  {}", entry.query)?;
        }
        Ok(())
    }
}

pub fn print_books<W: Write>(out: &mut W, books: &[BookRecord]) -> Result<()> {
    for (i, book) in books.iter().enumerate() {
        let title = if book.title.is_empty() { "(untitled)" } else { book.title.as_str() };
        write!(out, "  {}. {} by {}", i + 1, title, book.authors_display())?;
        if let Some(date) = &book.published_date {
            write!(out, " ({date})")?;
        }
        writeln!(out, " [{}]", book.id)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelf_core::{LookupRequest, MemoryStore, SearchConfig};

    struct Stub;

    impl Catalog for Stub {
        async fn lookup(&self, request: &LookupRequest) -> Result<Vec<BookRecord>, SearchError> {
            match request.query.as_str() {
                "Dune" => Ok(vec![BookRecord::new("A1", "Dune").with_authors(["Frank Herbert"]), BookRecord::new("A2", "Dune Messiah")]),
                "down" => Err(SearchError::Status(500)),
                _ => Ok(vec![]),
            }
        }
    }

    fn session() -> (Session<Stub, MemoryStore>, MemoryStore) {
        let store = MemoryStore::new();
        let shelf = Shelf::open(store.clone());
        (Session::new(SearchController::new(Stub, SearchConfig::default()), shelf), store)
    }

    async fn feed(session: &mut Session<Stub, MemoryStore>, lines: &[&str]) -> String {
        let mut out = Vec::new();
        for line in lines {
            session.handle_line(line, &mut out).await.unwrap();
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn parses_commands() {
        assert_eq!(parse("  search  the hobbit ").unwrap(), Some(Command::Search("the hobbit".into())));
        assert_eq!(parse("save 2").unwrap(), Some(Command::Save(2)));
        assert_eq!(
            parse("remove A1 Ciencia Ficción").unwrap(),
            Some(Command::Remove { id: "A1".into(), category: "Ciencia Ficción".into() })
        );
        assert_eq!(parse("").unwrap(), None);
        assert!(parse("search   ").is_err());
        assert!(parse("save 0").is_err());
        assert!(parse("save x").is_err());
        assert!(parse("remove A1").is_err());
        assert!(parse("dance").is_err());
    }

    #[tokio::test]
    async fn search_select_save_remove() {
        let (mut s, store) = session();
        let out = feed(&mut s, &["search Dune", "save 1"]).await;
        assert!(out.contains("2 results for \"Dune\""));
        assert!(out.contains("choose a category first"));
        assert!(store.raw("categories").is_none());

        let out = feed(&mut s, &["select Terror", "save 1", "save 9"]).await;
        assert!(out.contains("1. Dune by Frank Herbert [A1]"));
        assert!(out.contains("2. Dune Messiah by unknown [A2]"));
        assert!(out.contains("saved Dune to Terror"));
        assert!(out.contains("no result #9"));
        assert!(store.raw("categories").unwrap().contains("A1"));

        let out = feed(&mut s, &["remove A1 Terror", "show Terror"]).await;
        assert!(out.contains("removed 1 from Terror"));
        assert!(!out.contains("[A1]"));
    }

    #[tokio::test]
    async fn failed_and_empty_searches_are_reported_differently() {
        let (mut s, _) = session();
        let out = feed(&mut s, &["results", "search Dune", "search down", "search zzz"]).await;
        assert!(out.contains("no search yet"));
        assert!(out.contains("search for \"down\" failed: catalog returned status 500"));
        assert!(out.contains("previous results:"));
        assert!(out.contains("no results for \"zzz\""));
        assert_eq!(s.shelf.recent().queries().collect::<Vec<_>>(), ["zzz", "Dune"]);
    }

    #[tokio::test]
    async fn categories_show_visible_books_and_selection() {
        let (mut s, _) = session();
        let out = feed(&mut s, &["search Dune", "new Poesía", "select Poesía", "save 2", "toggle Poesía", "categories"]).await;
        assert!(out.contains("created Poesía"));
        assert!(out.contains("Poesía expanded"));
        assert!(out.contains("* Poesía (1)"));
        assert!(out.contains("  Terror (0)"));
        assert!(out.contains("1. Dune Messiah by unknown [A2]"));

        let out = feed(&mut s, &["select Nowhere", "toggle Nowhere", "categories"]).await;
        assert!(out.contains("no category named Nowhere"));
        assert!(!out.contains("Nowhere collapsed") && !out.contains("Nowhere expanded"));
    }

    #[tokio::test]
    async fn blank_search_is_refused_with_feedback() {
        let (mut s, _) = session();
        let mut out = Vec::new();
        assert!(!s.search("   ", &mut out).await.unwrap());
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("search text is empty"), "{out}");
        assert!(!out.contains("no search yet"));
        assert!(s.shelf.recent().is_empty());

        let mut out = Vec::new();
        assert!(!s.search("down", &mut out).await.unwrap());
        assert!(s.search("Dune", &mut out).await.unwrap());
    }

    #[tokio::test]
    async fn quit_stops_the_loop() {
        let (mut s, _) = session();
        let mut out = Vec::new();
        assert!(s.handle_line("help", &mut out).await.unwrap());
        assert!(!s.handle_line("quit", &mut out).await.unwrap());
    }
}
