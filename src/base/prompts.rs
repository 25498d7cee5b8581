//! Default persona, guidance, and canned reply text.
//!
//! Every value here can be overridden through configuration; these are the
//! built-in defaults used when a deployment does not provide its own.

/// Persona used as the system instruction for every completion request.
pub const PERSONA_DIRECTIVE: &str =
    "You are PrismStrap AI, a helpful and friendly Discord bot assistant for the PrismStrap Roblox utility client.";

/// Extra guidance appended to the persona in `support` channels.
pub const SUPPORT_GUIDANCE: &str = "You are answering in the support channel. Be patient and thorough, ask for details when a problem report is vague, and walk the user through fixes step by step.";

/// Extra guidance appended to the persona in `downloads` channels.
pub const DOWNLOADS_GUIDANCE: &str = "You are answering in the downloads channel. Stay on official download and installation information, and defer deep troubleshooting to the support channel.";

/// Reply for a bare mention with nothing else in the message.
pub const BARE_MENTION_PROMPT: &str = "Hey! How can I assist you with PrismStrap today?";

/// Reply when the completion succeeded but produced no text.
pub const EMPTY_COMPLETION_REPLY: &str = "Sorry, I couldn't think of a response. Could you try rephrasing your question?";

/// Reply when the completion call failed.
pub const GENERATION_FAILED_REPLY: &str = "⚠️ Sorry, I encountered an error while trying to respond. Please try again later.";

/// Reply to "what can you do".
pub const CAPABILITIES_REPLY: &str = "I can point you to the right channels for getting PrismStrap and its latest news, answer common PrismStrap questions, share a joke, toss a coin, or say what time it is. Anything else, just ask and I'll do my best!";

/// Default greeting tokens.
pub const GREETING_TOKENS: &[&str] = &["hi", "hello", "hey", "hiya", "yo", "sup"];

/// Default greeting replies.
///
/// Canned replies avoid keyword and micro-command phrases, since a reply to
/// them is stitched with this text before the keyword table is scanned.
pub const GREETING_REPLIES: &[&str] = &[
    "Hello! 👋 How can I assist you with PrismStrap today?",
    "Hey there! 👋 What can I do for you?",
    "Hi! 😊 Ask me anything about PrismStrap.",
];

/// Jokes for the "tell me a joke" micro-command.
pub const JOKES: &[&str] = &[
    "Why do programmers prefer dark mode? Because light attracts bugs.",
    "I told my computer I needed a break, and it said: \"No problem, I'll go to sleep.\"",
    "Why did the developer go broke? Because they used up all their cache.",
    "There are 10 kinds of people in the world: those who understand binary and those who don't.",
    "Why was the JavaScript developer sad? Because they didn't Node how to Express themselves.",
];

/// Template for the `/help` slash command.
pub const HELP_TEXT: &str = "**PrismStrap Support and Resources**

• 📥 Download & Usage: {channel:downloads}
• 🔧 Supported Executors & Updates: {channel:updates}
• 🆘 Support Channel: {channel:support}

Feel free to ask me any questions here!";
