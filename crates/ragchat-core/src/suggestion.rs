/// A canned prompt shown on an empty transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Suggestion {
    pub title: &'static str,
    pub query: &'static str,
}

pub const SUGGESTIONS: [Suggestion; 4] = [
    Suggestion {
        title: "Summarize documents",
        query: "Can you summarize the key points from my uploaded documents?",
    },
    Suggestion {
        title: "Find insights",
        query: "What are the main themes and insights across my documents?",
    },
    Suggestion {
        title: "Ask questions",
        query: "What are the most important takeaways I should know about?",
    },
    Suggestion {
        title: "Compare content",
        query: "Can you compare and contrast the different viewpoints in my documents?",
    },
];
