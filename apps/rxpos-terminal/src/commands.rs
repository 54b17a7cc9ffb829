//! Terminal input parsing.
//!
//! A USB barcode scanner behaves like a keyboard that types the code and
//! presses Enter, so any line not starting with `:` is a scan.

/// One line of terminal input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Scan(String),
    Add(String),
    SetQuantity { product_id: String, quantity: i64 },
    Remove(String),
    Clear,
    Checkout,
    Search(String),
    Filter(String),
    NextPage,
    ShowCart,
    ShowReceipt,
    NewSale,
    Help,
    Quit,
    /// Unknown or malformed command; carries the message to print.
    Invalid(String),
}

pub const HELP: &str = "\
  <code>               scan a barcode / SKU
  :add <id>            add one unit of a product
  :qty <id> <n>        set a line's quantity
  :rm <id>             remove a line
  :clear               empty the cart
  :pay                 check out
  :search <text>       search the backend catalog
  :filter <text>       filter the loaded catalog
  :next                load the next catalog page
  :cart                show the cart
  :receipt             reprint the last receipt
  :new                 start a new sale
  :quit                exit";

/// Parses one line. Blank lines yield `None`.
pub fn parse(line: &str) -> Option<Input> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let Some(command) = line.strip_prefix(':') else {
        return Some(Input::Scan(line.to_string()));
    };

    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let rest: Vec<&str> = parts.collect();

    let input = match (name, rest.as_slice()) {
        ("add", [id]) => Input::Add(id.to_string()),
        ("qty", [id, n]) => match n.parse() {
            Ok(quantity) => Input::SetQuantity {
                product_id: id.to_string(),
                quantity,
            },
            Err(_) => Input::Invalid(format!("Not a quantity: {}", n)),
        },
        ("rm", [id]) => Input::Remove(id.to_string()),
        ("clear", []) => Input::Clear,
        ("pay" | "checkout", []) => Input::Checkout,
        ("search", words) if !words.is_empty() => Input::Search(words.join(" ")),
        ("filter", words) => Input::Filter(words.join(" ")),
        ("next", []) => Input::NextPage,
        ("cart", []) => Input::ShowCart,
        ("receipt", []) => Input::ShowReceipt,
        ("new", []) => Input::NewSale,
        ("help" | "h", []) => Input::Help,
        ("quit" | "q", []) => Input::Quit,
        _ => Input::Invalid(format!("Unknown command: {} (try :help)", line)),
    };
    Some(input)
}
