//! System instruction for the website-building agent
//!
//! The instruction is fixed for a run. It names the host platform and shows
//! commands in that platform's shell syntax, since the agent passes the
//! model's commands through untranslated.

/// Shell family the generated commands must target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
    OtherUnix,
}

impl Platform {
    /// Platform this binary was built for
    pub fn detect() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    pub fn from_os(os: &str) -> Self {
        match os {
            "windows" => Platform::Windows,
            "macos" => Platform::MacOs,
            "linux" => Platform::Linux,
            _ => Platform::OtherUnix,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Platform::Windows => "windows (cmd.exe)",
            Platform::MacOs => "macos (sh)",
            Platform::Linux => "linux (sh)",
            Platform::OtherUnix => "unix (sh)",
        }
    }

    fn quoting_rule(&self) -> &'static str {
        match self {
            Platform::Windows => {
                "Commands must be Windows cmd compatible: escape angle brackets with a caret, \
                 e.g. echo ^<tag^> >> file"
            }
            _ => {
                "Commands must be POSIX sh compatible: wrap file content in single quotes, \
                 e.g. echo '<tag>' >> file"
            }
        }
    }

    fn examples(&self) -> &'static str {
        match self {
            Platform::Windows => {
                "cd MySite && echo ^<h1^>Hello^</h1^> >> index.html\n\
                 cd MySite && echo body { margin: 0; } >> style.css\n\
                 cd MySite && echo console.log(\"Hi\") >> script.js"
            }
            _ => {
                "cd MySite && echo '<h1>Hello</h1>' >> index.html\n\
                 cd MySite && echo 'body { margin: 0; }' >> style.css\n\
                 cd MySite && echo 'console.log(\"Hi\")' >> script.js"
            }
        }
    }
}

/// Build the system instruction for `platform`.
pub fn system_instruction(platform: Platform) -> String {
    format!(
        "You are a website builder expert. You must analyze user input and generate terminal commands step by step.\n\
         \n\
         You have access to a tool that can execute any terminal command.\n\
         \n\
         Current platform is: {platform}\n\
         \n\
         --- YOUR TASK ---\n\
         1. Understand the website the user wants to create.\n\
         2. Give terminal commands to:\n\
         \x20  - Create a folder for the project\n\
         \x20  - Create index.html\n\
         \x20  - Create style.css\n\
         \x20  - Create script.js\n\
         \x20  - Write full HTML into index.html using echo\n\
         \x20  - Write full CSS into style.css using echo\n\
         \x20  - Write working JS into script.js using echo\n\
         3. Add realistic styling and interactivity.\n\
         4. {rule}\n\
         5. Run one command per tool call and read its result before the next one. \
         If a command fails, fix it and try again.\n\
         6. When the site is complete, reply with a short summary instead of a tool call.\n\
         \n\
         Example commands:\n\
         {examples}\n",
        platform = platform.name(),
        rule = platform.quoting_rule(),
        examples = platform.examples(),
    )
}
