/*!

This is the long-form manual for `runoff_tally` and the `rankzilla` command line.

## The counting procedure

Polls are decided by instant-runoff voting. Every voter ranks some or all of the
options of a poll. The ranks are first turned into a canonical ballot:
the options are sorted by rank (equal ranks keep the order in which they were
submitted), options that do not belong to the poll are dropped, and an option
ranked twice keeps its best rank. A ballot may end up empty. It still counts in
the total number of votes.

The count then proceeds in rounds:

1. every ballot goes to its most preferred option that is still running. A ballot
   whose options are all eliminated is exhausted and goes nowhere.
2. the counts of every option are recorded for this round. Eliminated options
   are reported with a count of 0.
3. if an option has strictly more than `floor(total / 2) + 1` votes, it wins.
4. otherwise all the running options with the lowest count are selected. If this
   selection is every running option, the poll ends in a tie between them.
5. otherwise the selected options are eliminated together and a new round starts.

The number of rounds is never larger than the number of options.

## Known quirks

These behaviors differ from textbook instant-runoff and are relied upon by past
polls.

**The winning threshold.** `total` is the number of ballots, including the
empty ones, and it does not change between rounds. The comparison is strict
against `floor(total / 2) + 1`, which is one vote more than a textbook
majority. With 4 ballots, an option holding 3 of them does not win in that round.

**The lone survivor.** When every other option has been eliminated, the last
option is reported as a tie of one, not as a winner. Presentation layers are
free to announce it as the winner; the `rankzilla` summary line does so.

**Empty polls.** With no ballot at all, every option has 0 votes in the first
round and the poll ends as a tie between all the options.

## Output

The `rankzilla` command line writes the outcome as JSON:

```text
{
  "status": "tie",
  "tiedOptions": [ { "optionId": "1", "name": "A", "voteCount": 3 }, ... ],
  "totalVotes": 6,
  "rounds": [ { "round": 1, "results": { "1": { "name": "A", "count": 3, "eliminated": false }, ... } } ]
}
```

A winner is reported with `"status": "winner"` and the fields `optionId`, `name`,
`voteCount`, `totalVotes` and `rounds`.

*/
