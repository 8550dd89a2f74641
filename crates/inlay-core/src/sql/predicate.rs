use crate::value::SqlValue;
use std::fmt::Write;

///
/// Filter
///
/// A boolean fragment for WHERE clauses: a template with positional `?`
/// placeholders plus arguments. Two rendering modes:
///
/// - [`Filter::new`] substitutes arguments inline as SQL literals, then
///   rewrites every double quote to a single quote. That substitution is the
///   historical literal-syntax shim and must stay byte-compatible; it is NOT
///   an injection defense — an argument carrying both quote styles will still
///   corrupt the fragment.
/// - [`Filter::bound`] keeps the arguments out of the text and binds them as
///   real statement parameters. Use this whenever an argument is untrusted.
///

#[derive(Clone, Debug)]
pub struct Filter {
    template: String,
    args: Vec<SqlValue>,
    bound: bool,
}

impl Filter {
    /// Inline-rendered filter with the quote-substitution rule.
    pub fn new<A>(template: impl Into<String>, args: A) -> Self
    where
        A: IntoIterator,
        A::Item: Into<SqlValue>,
    {
        Self {
            template: template.into(),
            args: args.into_iter().map(Into::into).collect(),
            bound: false,
        }
    }

    /// Parameter-bound filter; arguments never enter the statement text.
    pub fn bound<A>(template: impl Into<String>, args: A) -> Self
    where
        A: IntoIterator,
        A::Item: Into<SqlValue>,
    {
        Self {
            bound: true,
            ..Self::new(template, args)
        }
    }

    #[must_use]
    pub const fn is_bound(&self) -> bool {
        self.bound
    }

    /// Produce the SQL fragment and the parameters to bind with it.
    /// `first_placeholder` numbers bound placeholders after any parameters
    /// the surrounding statement already owns.
    #[must_use]
    pub fn render(&self, first_placeholder: usize) -> (String, Vec<SqlValue>) {
        if self.bound {
            (self.render_bound(first_placeholder), self.args.clone())
        } else {
            (self.render_inline(), Vec::new())
        }
    }

    fn render_inline(&self) -> String {
        let mut out = String::with_capacity(self.template.len());
        let mut args = self.args.iter();

        for ch in self.template.chars() {
            if ch == '?' {
                match args.next() {
                    Some(arg) => out.push_str(&arg.literal()),
                    None => out.push('?'),
                }
            } else {
                out.push(ch);
            }
        }

        out.replace('"', "'")
    }

    fn render_bound(&self, first_placeholder: usize) -> String {
        let mut out = String::with_capacity(self.template.len());
        let mut next = first_placeholder;
        let mut remaining = self.args.len();

        for ch in self.template.chars() {
            if ch == '?' && remaining > 0 {
                let _ = write!(out, "?{next}");
                next += 1;
                remaining -= 1;
            } else {
                out.push(ch);
            }
        }

        out
    }
}
