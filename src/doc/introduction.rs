/*!
# Playing a Story

Start the interpreter with the story file you want to play. Files for
versions 3 to 8 of the Z-machine are supported, usually named with a
`.z3`, `.z5` or `.z8` extension.
<pre><code>&nbsp;  zcode zork1.z3
</code></pre>

The story prints its opening text and waits at its prompt. Type a command
followed by ENTER. The arrow keys recall earlier commands for editing.
Stop the interpreter at any time with CTRL-C, or with CTRL-D at a prompt.

## Saving and restoring

Stories save and restore through their own commands, usually `SAVE` and
`RESTORE`. You are asked for a file name and the default is the story's
name with a `.qzl` extension in the save directory. Save files use the
Quetzal format so they can be moved between interpreters. A save file
named on the command line is restored before the story starts.
<pre><code>&nbsp;  zcode zork1.z3 zork1.qzl
</code></pre>

Stories that offer `UNDO` keep five turns of history unless `--undo`
asks for a different number. `--undo 0` turns it off.

## Transcripts and command records

`SCRIPT` starts a transcript of everything printed and typed, and
`UNSCRIPT` ends it. Stories that support command records write each
command you type to a `.rec` file and can later replay it.

## Options

| Option | Meaning |
|--------|---------|
| `-w`, `--warnings` | Show warnings about questionable story behaviour |
| `-W`, `--fatal` | Stop the story at the first warning |
| `-v`, `--verbose` | Show debugging output |
| `--seed N` | Start the random number generator from N |
| `--undo N` | Keep N turns of undo history |
| `--save-dir DIR` | Put saves, transcripts and records in DIR |

Warnings and errors are printed to the standard error stream as
`[ WARNING - ... ]` lines, leaving the story's own text undisturbed.

## Limits

The interpreter draws only the main window. Text a story places in an
upper window is not shown, except for the version 3 status line, which
is printed before each command. Pictures, sounds and menus are
reported to the story as unavailable.

*/
