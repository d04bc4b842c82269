//! JUnit-style XML rendering of one suite.

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::borrow::Cow;
use std::io::Write;

use crate::core::error::Result;
use crate::suite::{Failure, TestCase, TestSuite};

/// Render one suite as a `<testsuites>` document.
pub fn write_suite<W: Write>(out: W, suite: &TestSuite) -> Result<()> {
    let mut writer = Writer::new_with_indent(out, b' ', 4);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    writer.write_event(Event::Start(BytesStart::new("testsuites")))?;

    let mut tag = BytesStart::new("testsuite");
    tag.extend_attributes([
        ("name", &*xml_safe(&suite.name)),
        ("package", &*xml_safe(&suite.package)),
        ("tests", suite.tests.to_string().as_str()),
        ("failures", suite.failures.to_string().as_str()),
        ("errors", suite.errors.to_string().as_str()),
        ("skipped", suite.skipped.to_string().as_str()),
        ("time", format!("{:.3}", suite.time).as_str()),
    ]);
    writer.write_event(Event::Start(tag))?;

    for case in &suite.testcases {
        write_case(&mut writer, case)?;
    }

    writer.write_event(Event::End(BytesEnd::new("testsuite")))?;
    writer.write_event(Event::End(BytesEnd::new("testsuites")))?;
    writer.write_indent()?;
    Ok(())
}

/// Render one suite into a string.
pub fn suite_to_string(suite: &TestSuite) -> Result<String> {
    let mut buf = Vec::new();
    write_suite(&mut buf, suite)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn write_case<W: Write>(writer: &mut Writer<W>, case: &TestCase) -> Result<()> {
    let mut tag = BytesStart::new("testcase");
    tag.extend_attributes([
        ("name", &*xml_safe(&case.name)),
        ("classname", &*xml_safe(&case.classname)),
        ("time", format!("{:.3}", case.time).as_str()),
    ]);
    writer.write_event(Event::Start(tag))?;

    if case.is_skipped() {
        writer.write_event(Event::Empty(BytesStart::new("skipped")))?;
    }
    for failure in &case.failures {
        write_message(writer, "failure", failure)?;
    }
    for error in &case.errors {
        write_message(writer, "error", error)?;
    }
    write_text(writer, "system-out", &case.systemout)?;
    write_text(writer, "system-err", &case.systemerr)?;

    writer.write_event(Event::End(BytesEnd::new("testcase")))?;
    Ok(())
}

fn write_message<W: Write>(writer: &mut Writer<W>, name: &str, failure: &Failure) -> Result<()> {
    let value = xml_safe(&failure.value);
    let first_line = value.lines().next().unwrap_or_default();
    let mut tag = BytesStart::new(name);
    tag.push_attribute(("message", first_line));
    writer.write_event(Event::Start(tag))?;
    writer.write_event(Event::Text(BytesText::new(&value)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn write_text<W: Write>(writer: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(&xml_safe(text))))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Replace characters outside the XML 1.0 `Char` production with U+FFFD.
///
/// Escaping alone does not cover control characters such as the ESC of
/// ANSI colour codes, which no XML document may contain.
fn xml_safe(text: &str) -> Cow<'_, str> {
    fn allowed(c: char) -> bool {
        matches!(c, '\t' | '\n' | '\r')
            || ('\u{20}'..='\u{D7FF}').contains(&c)
            || ('\u{E000}'..='\u{FFFD}').contains(&c)
            || c >= '\u{10000}'
    }

    if text.chars().all(allowed) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(
            text.chars()
                .map(|c| if allowed(c) { c } else { '\u{FFFD}' })
                .collect(),
        )
    }
}
