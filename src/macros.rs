/// A lazily compiled, process-wide `&'static Regex`.
#[macro_export]
macro_rules! regex {
    ($pat:literal) => {{
        static RE: once_cell::sync::Lazy<regex::Regex> =
            once_cell::sync::Lazy::new(|| regex::Regex::new($pat).unwrap());
        &*RE
    }};
}

/// A [`Marker::Pattern`](crate::Marker::Pattern) from a regular expression.
#[macro_export]
macro_rules! re {
    ($pat:expr) => {
        $crate::Marker::Pattern(::std::string::String::from($pat))
    };
}

/// Declare a [`TermDef`](crate::TermDef).
///
/// ```
/// use dialect::{re, term};
///
/// let number = term! { entity: re!(r"\d+"), postgroups: ["operator"] };
/// let paren = term! {
///     start: "(",
///     end: ")",
///     subgroups: ["number", "paren"],
///     postgroups: ["operator"],
/// };
/// assert!(number.entity.is_some());
/// assert_eq!(paren.subgroups.unwrap(), vec!["number", "paren"]);
/// ```
#[macro_export]
macro_rules! term {
    (
        entity: $marker:expr
        $(, postgroups: [ $($post:expr),* $(,)? ])?
        $(, same_postgroups: $same:expr)?
        $(,)?
    ) => {{
        #[allow(unused_mut)]
        let mut def = $crate::TermDef::entity($marker);
        $(
            let names: ::std::vec::Vec<::std::string::String> = ::std::vec![ $(::std::string::String::from($post)),* ];
            def = def.postgroups(names);
        )?
        $( def.same_postgroups = $same; )?
        def
    }};
    (
        start: $start:expr,
        end: $end:expr,
        subgroups: [ $($sub:expr),* $(,)? ]
        $(, postgroups: [ $($post:expr),* $(,)? ])?
        $(, same_postgroups: $same:expr)?
        $(,)?
    ) => {{
        let subgroups: ::std::vec::Vec<::std::string::String> = ::std::vec![ $(::std::string::String::from($sub)),* ];
        #[allow(unused_mut)]
        let mut def = $crate::TermDef::group($start, $end, subgroups);
        $(
            let names: ::std::vec::Vec<::std::string::String> = ::std::vec![ $(::std::string::String::from($post)),* ];
            def = def.postgroups(names);
        )?
        $( def.same_postgroups = $same; )?
        def
    }};
}
