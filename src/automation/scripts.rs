//! Host script builders
//!
//! PowerShell for Windows and AppleScript for macOS. Scripts report their
//! outcome through the marker constants below on stdout.

pub const FOCUS_PROBE_TAG: &str = "# listenos:focus-probe";
pub const FOCUS_OK: &str = "FOCUS:OK";
pub const FOCUS_MISSING: &str = "FOCUS:MISSING";
pub const FOCUS_UNVERIFIED: &str = "FOCUS:UNVERIFIED";
pub const ACTIVATED: &str = "ACTIVATED";
pub const NOT_ACTIVATED: &str = "NOT_ACTIVATED";
pub const LAUNCHED: &str = "LAUNCHED";
pub const OUTLOOK_OPENED: &str = "OUTLOOK:OPENED";
pub const DOCUMENT_SAVED: &str = "DOCUMENT:SAVED";

/// Paths Chrome is usually installed under when it is not on PATH
const CHROME_PATHS: &[&str] = &[
    r"$env:ProgramFiles\Google\Chrome\Application\chrome.exe",
    r"${env:ProgramFiles(x86)}\Google\Chrome\Application\chrome.exe",
    r"$env:LOCALAPPDATA\Google\Chrome\Application\chrome.exe",
];

/// Characters PowerShell accepts as a single quote inside '...' literals
const PS_SINGLE_QUOTES: &[char] = &['\'', '\u{2018}', '\u{2019}', '\u{201A}', '\u{201B}'];

/// PowerShell single-quoted literal
pub fn ps_quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        if PS_SINGLE_QUOTES.contains(&c) {
            quoted.push(c);
        }
        quoted.push(c);
    }
    quoted.push('\'');
    quoted
}

/// AppleScript double-quoted literal
pub fn applescript_quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Case-insensitive regex matching every word of `app` in order
pub fn window_regex(app: &str) -> String {
    app.split_whitespace()
        .map(|word| {
            let cleaned: String = word.chars().filter(|c| !matches!(c, '"' | '\'' | '\\')).collect();
            regex::escape(&cleaned)
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(".*")
}

pub fn start_program(program: &str) -> String {
    format!(
        "Start-Process -FilePath {} -ErrorAction Stop\nWrite-Output '{}'",
        ps_quote(program),
        LAUNCHED
    )
}

pub fn start_uri(uri: &str) -> String {
    format!("Start-Process {} -ErrorAction Stop\nWrite-Output '{}'", ps_quote(uri), LAUNCHED)
}

/// Open `url` in `browser`, falling back to the default browser
pub fn open_in_browser(browser: &str, url: &str) -> String {
    let candidates = if browser.eq_ignore_ascii_case("chrome") {
        CHROME_PATHS
            .iter()
            .map(|p| format!("\"{}\"", p))
            .collect::<Vec<_>>()
            .join(", ")
    } else {
        String::new()
    };

    format!(
        r#"$url = {url}
$browser = {browser}
$exe = @({candidates}) | Where-Object {{ $_ -and (Test-Path $_) }} | Select-Object -First 1
try {{
    if ($exe) {{ Start-Process -FilePath $exe -ArgumentList $url -ErrorAction Stop }}
    else {{ Start-Process -FilePath $browser -ArgumentList $url -ErrorAction Stop }}
}} catch {{
    Start-Process $url
}}
Write-Output '{marker}'"#,
        url = ps_quote(url),
        browser = ps_quote(browser),
        candidates = candidates,
        marker = LAUNCHED,
    )
}

/// One focus attempt: find, restore, raise, verify
pub fn focus_probe(app: &str) -> String {
    format!(
        r#"{tag}
$ErrorActionPreference = 'SilentlyContinue'
Add-Type @"
using System;
using System.Runtime.InteropServices;
public class ListenWin {{
    [DllImport("user32.dll")] public static extern bool SetForegroundWindow(IntPtr hWnd);
    [DllImport("user32.dll")] public static extern bool ShowWindow(IntPtr hWnd, int nCmdShow);
    [DllImport("user32.dll")] public static extern bool IsIconic(IntPtr hWnd);
    [DllImport("user32.dll")] public static extern bool BringWindowToTop(IntPtr hWnd);
    [DllImport("user32.dll")] public static extern IntPtr GetForegroundWindow();
}}
"@
$pattern = {pattern}
$proc = Get-Process | Where-Object {{ $_.MainWindowHandle -ne 0 -and ($_.ProcessName -match $pattern -or $_.MainWindowTitle -match $pattern) }} | Sort-Object StartTime -Descending | Select-Object -First 1
if (-not $proc) {{ Write-Output '{missing}'; exit 0 }}
$hwnd = $proc.MainWindowHandle
if ([ListenWin]::IsIconic($hwnd)) {{ [ListenWin]::ShowWindow($hwnd, 9) | Out-Null }}
[ListenWin]::BringWindowToTop($hwnd) | Out-Null
[ListenWin]::SetForegroundWindow($hwnd) | Out-Null
Start-Sleep -Milliseconds 200
if ([ListenWin]::GetForegroundWindow() -eq $hwnd) {{ Write-Output '{ok}' }} else {{ Write-Output '{unverified}' }}"#,
        tag = FOCUS_PROBE_TAG,
        pattern = ps_quote(&window_regex(app)),
        missing = FOCUS_MISSING,
        ok = FOCUS_OK,
        unverified = FOCUS_UNVERIFIED,
    )
}

/// Last-resort activation by window title
pub fn app_activate(app: &str) -> String {
    format!(
        "$wshell = New-Object -ComObject WScript.Shell\nif ($wshell.AppActivate({})) {{ Write-Output '{}' }} else {{ Write-Output '{}' }}",
        ps_quote(app),
        ACTIVATED,
        NOT_ACTIVATED
    )
}

pub fn mac_focus_probe(app: &str) -> String {
    format!(
        r#"{tag}
tell application "System Events"
    set matches to (name of every process whose background only is false and name contains {name})
    if matches is {{}} then return "{missing}"
    set target to item 1 of matches
    set frontmost of process target to true
    delay 0.2
    if frontmost of process target then return "{ok}"
end tell
return "{unverified}""#,
        tag = "-- listenos:focus-probe",
        name = applescript_quote(app),
        missing = FOCUS_MISSING,
        ok = FOCUS_OK,
        unverified = FOCUS_UNVERIFIED,
    )
}

pub fn mac_activate(app: &str) -> String {
    format!(
        "tell application {} to activate\nreturn \"{}\"",
        applescript_quote(app),
        ACTIVATED
    )
}

/// Type pre-escaped SendKeys tokens with a delay after each
pub fn send_keys_sequence(tokens: &[(String, u64)]) -> String {
    let mut script = String::from(
        "$ErrorActionPreference = 'Stop'\nAdd-Type -AssemblyName System.Windows.Forms\nStart-Sleep -Milliseconds 100\n",
    );
    for (token, delay_ms) in tokens {
        script.push_str(&format!(
            "[System.Windows.Forms.SendKeys]::SendWait({})\n",
            ps_quote(token)
        ));
        if *delay_ms > 0 {
            script.push_str(&format!("Start-Sleep -Milliseconds {}\n", delay_ms));
        }
    }
    script
}

/// Clear the clipboard, select everything in the focused window and copy it
pub fn capture_selection() -> String {
    r#"$ErrorActionPreference = 'Stop'
Add-Type -AssemblyName System.Windows.Forms
[System.Windows.Forms.Clipboard]::Clear()
Start-Sleep -Milliseconds 200
[System.Windows.Forms.SendKeys]::SendWait('^a')
Start-Sleep -Milliseconds 300
[System.Windows.Forms.SendKeys]::SendWait('^c')
Start-Sleep -Milliseconds 500"#
        .to_string()
}

/// New Outlook mail item shown to the user
pub fn outlook_compose() -> String {
    format!(
        r#"$ErrorActionPreference = 'Stop'
$outlook = New-Object -ComObject Outlook.Application
$mail = $outlook.CreateItem(0)
$mail.Display()
Write-Output '{}'"#,
        OUTLOOK_OPENED
    )
}

/// Word document from a JSON payload `{title, sections: [{heading, paragraphs}]}`
pub fn word_document(payload: &str, output: &str) -> String {
    format!(
        r#"$ErrorActionPreference = 'Stop'
$data = Get-Content -Raw -Encoding UTF8 -Path {payload} | ConvertFrom-Json
$word = New-Object -ComObject Word.Application
try {{
    $word.Visible = $false
    $doc = $word.Documents.Add()
    $sel = $word.Selection
    $sel.Style = $doc.Styles.Item(-63)
    $sel.TypeText($data.title)
    $sel.TypeParagraph()
    foreach ($section in $data.sections) {{
        if ($section.heading) {{
            $sel.Style = $doc.Styles.Item(-2)
            $sel.TypeText($section.heading)
            $sel.TypeParagraph()
        }}
        foreach ($paragraph in $section.paragraphs) {{
            $sel.Style = $doc.Styles.Item(-1)
            $sel.TypeText($paragraph)
            $sel.TypeParagraph()
        }}
    }}
    $doc.SaveAs2({output}, 16)
    Write-Output '{marker}'
}} finally {{
    if ($doc) {{ $doc.Close(0) }}
    $word.Quit()
    [Runtime.InteropServices.Marshal]::ReleaseComObject($word) | Out-Null
}}"#,
        payload = ps_quote(payload),
        output = ps_quote(output),
        marker = DOCUMENT_SAVED,
    )
}

/// PowerPoint deck from `{title, slides: [{title, bullets}]}`
pub fn powerpoint_presentation(payload: &str, output: &str) -> String {
    format!(
        r#"$ErrorActionPreference = 'Stop'
$data = Get-Content -Raw -Encoding UTF8 -Path {payload} | ConvertFrom-Json
$ppt = New-Object -ComObject PowerPoint.Application
try {{
    $deck = $ppt.Presentations.Add(0)
    $cover = $deck.Slides.Add(1, 1)
    $cover.Shapes.Item(1).TextFrame.TextRange.Text = $data.title
    $index = 2
    foreach ($slide in $data.slides) {{
        $s = $deck.Slides.Add($index, 2)
        $s.Shapes.Item(1).TextFrame.TextRange.Text = $slide.title
        $s.Shapes.Item(2).TextFrame.TextRange.Text = ($slide.bullets -join "`r")
        $index++
    }}
    $deck.SaveAs({output})
    Write-Output '{marker}'
}} finally {{
    if ($deck) {{ $deck.Close() }}
    $ppt.Quit()
    [Runtime.InteropServices.Marshal]::ReleaseComObject($ppt) | Out-Null
}}"#,
        payload = ps_quote(payload),
        output = ps_quote(output),
        marker = DOCUMENT_SAVED,
    )
}

/// Excel workbook from `{title, rows: [[cell]]}`; the first row is the header
pub fn excel_workbook(payload: &str, output: &str) -> String {
    format!(
        r#"$ErrorActionPreference = 'Stop'
$data = Get-Content -Raw -Encoding UTF8 -Path {payload} | ConvertFrom-Json
$excel = New-Object -ComObject Excel.Application
try {{
    $excel.Visible = $false
    $excel.DisplayAlerts = $false
    $book = $excel.Workbooks.Add()
    $sheet = $book.Worksheets.Item(1)
    $r = 1
    foreach ($row in $data.rows) {{
        $c = 1
        foreach ($cell in $row) {{
            $sheet.Cells.Item($r, $c) = $cell
            if ($r -eq 1) {{ $sheet.Cells.Item($r, $c).Font.Bold = $true }}
            $c++
        }}
        $r++
    }}
    $sheet.UsedRange.Columns.AutoFit() | Out-Null
    $book.SaveAs({output}, 51)
    Write-Output '{marker}'
}} finally {{
    if ($book) {{ $book.Close($false) }}
    $excel.Quit()
    [Runtime.InteropServices.Marshal]::ReleaseComObject($excel) | Out-Null
}}"#,
        payload = ps_quote(payload),
        output = ps_quote(output),
        marker = DOCUMENT_SAVED,
    )
}
