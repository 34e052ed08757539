#[derive(Clone)]
pub(super) enum State {
    Normal,
    SingleQuoted,
    EscapeQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment(u32),
    DollarQuoted(String),
}
