//! The CSS subset the locators use: comma groups, descendant and child
//! combinators, `tag`, `*`, `#id`, `.class` and `[attr]` with `=`, `*=`,
//! `^=`, `$=`, `~=` operators.

#[derive(Debug, Clone, PartialEq)]
pub struct SelectorList(pub Vec<Complex>);

#[derive(Debug, Clone, PartialEq)]
pub struct Complex {
    /// Compounds left to right.
    pub compounds: Vec<Compound>,
    /// `combinators[i]` joins `compounds[i]` and `compounds[i + 1]`.
    pub combinators: Vec<Combinator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Compound {
    pub tag: Option<String>,
    pub ids: Vec<String>,
    pub classes: Vec<String>,
    pub attrs: Vec<AttrSel>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttrSel {
    pub name: String,
    pub op: AttrOp,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrOp {
    Exists,
    Equals,
    Contains,
    Prefix,
    Suffix,
    Word,
}

/// What a compound needs to know about an element.
pub trait ElementView {
    fn tag(&self) -> &str;
    fn attr(&self, name: &str) -> Option<&str>;
}

impl AttrSel {
    fn matches(&self, actual: Option<&str>) -> bool {
        let Some(actual) = actual else {
            return false;
        };
        let v = self.value.as_str();
        match self.op {
            AttrOp::Exists => true,
            AttrOp::Equals => actual == v,
            AttrOp::Contains => !v.is_empty() && actual.contains(v),
            AttrOp::Prefix => !v.is_empty() && actual.starts_with(v),
            AttrOp::Suffix => !v.is_empty() && actual.ends_with(v),
            AttrOp::Word => actual.split_whitespace().any(|w| w == v),
        }
    }
}

impl Compound {
    pub fn matches<E: ElementView>(&self, el: &E) -> bool {
        if let Some(tag) = &self.tag {
            if !tag.eq_ignore_ascii_case(el.tag()) {
                return false;
            }
        }
        if self.ids.iter().any(|id| el.attr("id") != Some(id.as_str())) {
            return false;
        }
        let class = el.attr("class").unwrap_or("");
        if self.classes.iter().any(|c| !class.split_whitespace().any(|w| w == c)) {
            return false;
        }
        self.attrs.iter().all(|a| a.matches(el.attr(&a.name)))
    }
}

pub fn parse(selector: &str) -> Option<SelectorList> {
    let groups = split_groups(selector)?;
    let mut out = Vec::with_capacity(groups.len());
    for group in groups {
        out.push(parse_complex(group.trim())?);
    }
    if out.is_empty() {
        None
    } else {
        Some(SelectorList(out))
    }
}

/// Split on top-level commas, ignoring commas inside brackets or quotes.
fn split_groups(selector: &str) -> Option<Vec<&str>> {
    let mut groups = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in selector.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth -= 1,
            (None, ',') if depth == 0 => {
                groups.push(&selector[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if quote.is_some() || depth != 0 {
        return None;
    }
    groups.push(&selector[start..]);
    if groups.iter().any(|g| g.trim().is_empty()) {
        return None;
    }
    Some(groups)
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

struct Cursor<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Cursor<'a> {
    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn skip_ws(&mut self) -> bool {
        let mut skipped = false;
        while self.peek().is_some_and(char::is_whitespace) {
            self.chars.next();
            skipped = true;
        }
        skipped
    }

    fn ident(&mut self) -> Option<String> {
        let mut out = String::new();
        while let Some(c) = self.peek().filter(|c| is_ident_char(*c)) {
            out.push(c);
            self.chars.next();
        }
        (!out.is_empty()).then_some(out)
    }

    fn attr(&mut self) -> Option<AttrSel> {
        self.skip_ws();
        let name = self.ident()?;
        self.skip_ws();
        let op = match self.chars.next()? {
            ']' => {
                return Some(AttrSel {
                    name,
                    op: AttrOp::Exists,
                    value: String::new(),
                })
            }
            '=' => AttrOp::Equals,
            c @ ('*' | '^' | '$' | '~') => {
                if self.chars.next()? != '=' {
                    return None;
                }
                match c {
                    '*' => AttrOp::Contains,
                    '^' => AttrOp::Prefix,
                    '$' => AttrOp::Suffix,
                    _ => AttrOp::Word,
                }
            }
            _ => return None,
        };
        self.skip_ws();
        let value = match self.peek()? {
            q @ ('"' | '\'') => {
                self.chars.next();
                let mut v = String::new();
                loop {
                    let c = self.chars.next()?;
                    if c == q {
                        break;
                    }
                    v.push(c);
                }
                v
            }
            _ => self.ident()?,
        };
        self.skip_ws();
        (self.chars.next()? == ']').then_some(AttrSel { name, op, value })
    }

    fn compound(&mut self) -> Option<Compound> {
        let mut compound = Compound::default();
        let mut any = false;
        while let Some(c) = self.peek() {
            match c {
                '*' => {
                    self.chars.next();
                }
                '#' => {
                    self.chars.next();
                    compound.ids.push(self.ident()?);
                }
                '.' => {
                    self.chars.next();
                    compound.classes.push(self.ident()?);
                }
                '[' => {
                    self.chars.next();
                    compound.attrs.push(self.attr()?);
                }
                c if is_ident_char(c) && !any => {
                    compound.tag = Some(self.ident()?.to_ascii_lowercase());
                }
                _ => break,
            }
            any = true;
        }
        any.then_some(compound)
    }
}

fn parse_complex(group: &str) -> Option<Complex> {
    let mut cursor = Cursor { chars: group.chars().peekable() };
    let mut compounds = vec![cursor.compound()?];
    let mut combinators = Vec::new();

    loop {
        let saw_ws = cursor.skip_ws();
        match cursor.peek() {
            None => break,
            Some('>') => {
                cursor.chars.next();
                cursor.skip_ws();
                combinators.push(Combinator::Child);
            }
            Some(_) if saw_ws => combinators.push(Combinator::Descendant),
            Some(_) => return None,
        }
        compounds.push(cursor.compound()?);
    }
    Some(Complex { compounds, combinators })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_groups_and_combinators() {
        let list = parse(r#"div.a > button[role="switch"], .ct-spells [aria-expanded="false"]"#).unwrap();
        assert_eq!(list.0.len(), 2);
        assert_eq!(list.0[0].combinators, vec![Combinator::Child]);
        assert_eq!(list.0[0].compounds[1].tag.as_deref(), Some("button"));
        assert_eq!(list.0[1].combinators, vec![Combinator::Descendant]);
        assert_eq!(list.0[1].compounds[1].attrs[0].value, "false");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse("").is_none());
        assert!(parse("div,").is_none());
        assert!(parse("[data-x=\"open]").is_none());
        assert!(parse("a >").is_none());
    }

    #[test]
    fn test_attr_ops() {
        let list = parse(r#"input[placeholder*="Search"]"#).unwrap();
        let attr = &list.0[0].compounds[0].attrs[0];
        assert_eq!(attr.op, AttrOp::Contains);
        assert!(attr.matches(Some("Search Spell Names")));
        assert!(!attr.matches(Some("Filter")));
        assert!(!attr.matches(None));
    }
}
